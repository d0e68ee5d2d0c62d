//! Celestial body descriptors and the keyed registry.
//!
//! Orbital motion here is simple periodic circles, not physical simulation:
//! planets orbit the origin in the XZ plane, moons orbit their parent body.
//! The renderer only reads the current position and radius each frame.

use std::collections::HashMap;

use glam::Vec3;

/// A celestial body descriptor. Flags are immutable for the body's lifetime;
/// position and angles are advanced by [`BodyRegistry::advance`].
#[derive(Debug, Clone)]
pub struct CelestialBody {
    /// Stable identity, e.g. "earth".
    pub key: String,
    /// Current world-space position.
    pub position: Vec3,
    /// Body radius in world units.
    pub radius: f32,
    /// Circular orbit radius around the parent (0 for the star).
    pub orbit_radius: f32,
    /// Orbit angular speed, radians per time unit.
    pub orbit_speed: f32,
    /// Current orbit angle.
    pub orbit_phase: f32,
    /// Self-rotation speed, radians per time unit.
    pub rotation_speed: f32,
    /// Current rotation angle.
    pub rotation_angle: f32,
    /// Key into the texture cache.
    pub texture_key: String,
    /// Parent body key for moons; `None` orbits the origin.
    pub parent: Option<String>,
    pub has_atmosphere: bool,
    pub has_particles: bool,
    pub has_ring: bool,
    /// Self-lit body (the star ignores scene lighting).
    pub emissive: bool,
    /// Flat color standing in for missing or masked texels.
    pub fallback_color: [f32; 3],
    /// Atmosphere shell color.
    pub atmosphere_color: [f32; 3],
}

impl CelestialBody {
    /// A minimal body at the origin; builder-style setters fill in the rest.
    pub fn new(key: &str, radius: f32) -> Self {
        Self {
            key: key.to_string(),
            position: Vec3::ZERO,
            radius,
            orbit_radius: 0.0,
            orbit_speed: 0.0,
            orbit_phase: 0.0,
            rotation_speed: 0.0,
            rotation_angle: 0.0,
            texture_key: key.to_string(),
            parent: None,
            has_atmosphere: false,
            has_particles: false,
            has_ring: false,
            emissive: false,
            fallback_color: [1.0, 1.0, 1.0],
            atmosphere_color: [0.5, 0.7, 1.0],
        }
    }

    pub fn orbit(mut self, radius: f32, speed: f32) -> Self {
        self.orbit_radius = radius;
        self.orbit_speed = speed;
        self
    }

    pub fn rotation(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    pub fn color(mut self, rgb: [f32; 3]) -> Self {
        self.fallback_color = rgb;
        self
    }

    pub fn parent(mut self, key: &str) -> Self {
        self.parent = Some(key.to_string());
        self
    }

    pub fn atmosphere(mut self, rgb: [f32; 3]) -> Self {
        self.has_atmosphere = true;
        self.atmosphere_color = rgb;
        self
    }

    pub fn particles(mut self) -> Self {
        self.has_particles = true;
        self
    }

    pub fn ring(mut self) -> Self {
        self.has_ring = true;
        self
    }

    pub fn emissive_body(mut self) -> Self {
        self.emissive = true;
        self
    }
}

/// Ordered, keyed collection of bodies. Iteration preserves insertion order
/// so the star is always handled first.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    bodies: Vec<CelestialBody>,
    index: HashMap<String, usize>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a body, replacing any previous body with the same key.
    pub fn insert(&mut self, body: CelestialBody) {
        match self.index.get(&body.key) {
            Some(&i) => self.bodies[i] = body,
            None => {
                self.index.insert(body.key.clone(), self.bodies.len());
                self.bodies.push(body);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&CelestialBody> {
        self.index.get(key).map(|&i| &self.bodies[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CelestialBody> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Advance orbital and rotation angles by `dt` and recompute positions.
    ///
    /// Two passes: bodies orbiting the origin first, then parented bodies,
    /// so a moon always offsets from its parent's position this frame.
    pub fn advance(&mut self, dt: f32) {
        for body in &mut self.bodies {
            body.orbit_phase += body.orbit_speed * dt;
            body.rotation_angle += body.rotation_speed * dt;
            if body.parent.is_none() && body.orbit_radius > 0.0 {
                body.position = orbit_position(Vec3::ZERO, body.orbit_radius, body.orbit_phase);
            }
        }

        // Parent positions are final now; resolve moons against them.
        let parent_positions: HashMap<String, Vec3> = self
            .bodies
            .iter()
            .map(|b| (b.key.clone(), b.position))
            .collect();
        for body in &mut self.bodies {
            if let Some(parent_key) = &body.parent
                && let Some(&center) = parent_positions.get(parent_key)
            {
                body.position = orbit_position(center, body.orbit_radius, body.orbit_phase);
            }
        }
    }

    /// The nine classical bodies plus the moon, with the motion parameters
    /// and colors of the reference solar system layout.
    pub fn solar_system() -> Self {
        let mut registry = Self::new();

        registry.insert(
            CelestialBody::new("sun", 15.0)
                .rotation(2.0)
                .color([1.0, 0.8, 0.0])
                .particles()
                .emissive_body(),
        );
        registry.insert(
            CelestialBody::new("mercury", 3.0)
                .orbit(50.0, 0.5)
                .rotation(1.0)
                .color([0.7, 0.7, 0.7]),
        );
        registry.insert(
            CelestialBody::new("venus", 4.0)
                .orbit(80.0, 0.3)
                .rotation(0.8)
                .color([1.0, 0.6, 0.0]),
        );
        registry.insert(
            CelestialBody::new("earth", 5.0)
                .orbit(120.0, 0.2)
                .rotation(1.0)
                .color([0.0, 0.5, 1.0])
                .atmosphere([0.5, 0.7, 1.0]),
        );
        registry.insert(
            CelestialBody::new("moon", 1.5)
                .orbit(8.0, 0.2)
                .rotation(0.5)
                .color([0.8, 0.8, 0.8])
                .parent("earth"),
        );
        registry.insert(
            CelestialBody::new("mars", 3.5)
                .orbit(160.0, 0.15)
                .rotation(0.9)
                .color([1.0, 0.3, 0.0])
                .atmosphere([0.6, 0.4, 0.2]),
        );
        registry.insert(
            CelestialBody::new("jupiter", 12.0)
                .orbit(220.0, 0.1)
                .rotation(0.5)
                .color([0.8, 0.6, 0.4]),
        );
        registry.insert(
            CelestialBody::new("saturn", 10.0)
                .orbit(280.0, 0.08)
                .rotation(0.6)
                .color([0.9, 0.8, 0.6])
                .atmosphere([0.9, 0.8, 0.6])
                .ring(),
        );
        registry.insert(
            CelestialBody::new("uranus", 7.0)
                .orbit(340.0, 0.06)
                .rotation(0.7)
                .color([0.4, 0.7, 0.8]),
        );
        registry.insert(
            CelestialBody::new("neptune", 6.5)
                .orbit(400.0, 0.05)
                .rotation(0.8)
                .color([0.0, 0.3, 0.8]),
        );

        registry
    }
}

fn orbit_position(center: Vec3, radius: f32, phase: f32) -> Vec3 {
    center + Vec3::new(phase.cos() * radius, 0.0, phase.sin() * radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solar_system_has_ten_bodies_in_order() {
        let registry = BodyRegistry::solar_system();
        assert_eq!(registry.len(), 10);
        let first = registry.iter().next().unwrap();
        assert_eq!(first.key, "sun");
        assert!(first.emissive);
    }

    #[test]
    fn test_star_stays_at_origin() {
        let mut registry = BodyRegistry::solar_system();
        for _ in 0..100 {
            registry.advance(0.1);
        }
        assert_eq!(registry.get("sun").unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_planets_hold_orbit_radius() {
        let mut registry = BodyRegistry::solar_system();
        for _ in 0..50 {
            registry.advance(0.05);
        }
        let earth = registry.get("earth").unwrap();
        assert!((earth.position.length() - 120.0).abs() < 1e-3);
        assert_eq!(earth.position.y, 0.0, "orbits stay in the XZ plane");
    }

    #[test]
    fn test_moon_follows_earth() {
        let mut registry = BodyRegistry::solar_system();
        for _ in 0..50 {
            registry.advance(0.05);
        }
        let earth = registry.get("earth").unwrap().position;
        let moon = registry.get("moon").unwrap().position;
        assert!((earth.distance(moon) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_advance_is_deterministic() {
        let mut a = BodyRegistry::solar_system();
        let mut b = BodyRegistry::solar_system();
        for _ in 0..25 {
            a.advance(0.02);
            b.advance(0.02);
        }
        for (ba, bb) in a.iter().zip(b.iter()) {
            assert_eq!(ba.position, bb.position);
            assert_eq!(ba.rotation_angle, bb.rotation_angle);
        }
    }

    #[test]
    fn test_rotation_advances_for_stationary_star() {
        let mut registry = BodyRegistry::solar_system();
        registry.advance(1.0);
        let sun = registry.get("sun").unwrap();
        assert!((sun.rotation_angle - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_insert_replaces_by_key() {
        let mut registry = BodyRegistry::new();
        registry.insert(CelestialBody::new("earth", 5.0));
        registry.insert(CelestialBody::new("earth", 6.0));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("earth").unwrap().radius, 6.0);
    }

    #[test]
    fn test_effect_flags_match_layout() {
        let registry = BodyRegistry::solar_system();
        assert!(registry.get("earth").unwrap().has_atmosphere);
        assert!(registry.get("saturn").unwrap().has_ring);
        assert!(registry.get("sun").unwrap().has_particles);
        assert!(!registry.get("mercury").unwrap().has_atmosphere);
    }
}
