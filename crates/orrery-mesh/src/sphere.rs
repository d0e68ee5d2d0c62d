//! UV-sphere generation with a discrete detail level driving facet count.

use crate::vertex::SphereVertex;

/// Longitude segment floor. Below this a sphere silhouette stops reading as
/// round, so detail levels are clamped up to it.
pub const MIN_SEGMENTS: u32 = 8;

/// Latitude ring floor.
pub const MIN_RINGS: u32 = 4;

/// An immutable sphere mesh generated at a specific detail level.
#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub vertices: Vec<SphereVertex>,
    pub indices: Vec<u32>,
    /// The detail level this mesh was generated at, after clamping.
    pub detail_level: u32,
}

impl SphereMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Generate a UV-sphere of the given radius at the given detail level.
///
/// The detail level is the number of longitude segments; latitude rings are
/// half that. Facet count is a monotonic function of the level: equal levels
/// produce identical meshes, higher levels strictly more vertices. Levels
/// below [`MIN_SEGMENTS`] are raised to the floor.
///
/// Texture mapping: U is the longitude fraction with a duplicated seam column
/// so equirectangular textures wrap without interpolation artifacts; V uses
/// the equal-area projection `0.5 * (1 - sin(lat))`, which avoids stretching
/// at the poles.
pub fn generate_sphere(radius: f32, detail_level: u32) -> SphereMesh {
    let segments = detail_level.max(MIN_SEGMENTS);
    let rings = (segments / 2).max(MIN_RINGS);

    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        // lat sweeps from -pi/2 (south pole) to +pi/2 (north pole)
        let lat = std::f32::consts::PI * (ring as f32 / rings as f32 - 0.5);
        let (sin_lat, cos_lat) = lat.sin_cos();
        let v = 0.5 * (1.0 - sin_lat);

        for seg in 0..=segments {
            let lon = std::f32::consts::TAU * seg as f32 / segments as f32;
            let (sin_lon, cos_lon) = lon.sin_cos();

            let normal = [cos_lat * cos_lon, sin_lat, cos_lat * sin_lon];
            vertices.push(SphereVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                uv: [seg as f32 / segments as f32, v],
            });
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let i0 = ring * stride + seg;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;

            // Counter-clockwise winding viewed from outside the sphere.
            indices.extend_from_slice(&[i0, i1, i2]);
            indices.extend_from_slice(&[i1, i3, i2]);
        }
    }

    SphereMesh {
        vertices,
        indices,
        detail_level: segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_monotonic_in_detail_level() {
        let mut prev = 0usize;
        for level in [8, 12, 16, 24, 32, 48, 64] {
            let mesh = generate_sphere(1.0, level);
            assert!(
                mesh.vertex_count() >= prev,
                "vertex count decreased at level {level}"
            );
            prev = mesh.vertex_count();
        }
    }

    #[test]
    fn test_vertex_count_strictly_increases_between_distinct_levels() {
        let low = generate_sphere(1.0, MIN_SEGMENTS);
        let high = generate_sphere(1.0, 48);
        assert!(high.vertex_count() > low.vertex_count());
        assert!(high.triangle_count() > low.triangle_count());
    }

    #[test]
    fn test_levels_below_floor_are_clamped() {
        let clamped = generate_sphere(1.0, 2);
        let floor = generate_sphere(1.0, MIN_SEGMENTS);
        assert_eq!(clamped.detail_level, MIN_SEGMENTS);
        assert_eq!(clamped.vertex_count(), floor.vertex_count());
    }

    #[test]
    fn test_positions_lie_on_sphere() {
        let radius = 5.0;
        let mesh = generate_sphere(radius, 16);
        for v in &mesh.vertices {
            let r = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((r - radius).abs() < 1e-4, "vertex off sphere: r={r}");
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let mesh = generate_sphere(3.0, 16);
        for v in &mesh.vertices {
            let len = (v.normal[0].powi(2) + v.normal[1].powi(2) + v.normal[2].powi(2)).sqrt();
            assert!((len - 1.0).abs() < 1e-5, "normal not unit: {len}");
        }
    }

    #[test]
    fn test_indices_are_in_bounds_and_triangulated() {
        let mesh = generate_sphere(1.0, 24);
        assert_eq!(mesh.indices.len() % 3, 0);
        let count = mesh.vertex_count() as u32;
        for &i in &mesh.indices {
            assert!(i < count);
        }
    }

    #[test]
    fn test_uv_in_unit_range_and_equal_area_at_poles() {
        let mesh = generate_sphere(1.0, 16);
        for v in &mesh.vertices {
            assert!((0.0..=1.0).contains(&v.uv[0]));
            assert!((0.0..=1.0).contains(&v.uv[1]));
        }
        // South pole (lat = -pi/2) maps to v = 1, north pole to v = 0.
        let south = &mesh.vertices[0];
        let north = mesh.vertices.last().unwrap();
        assert!((south.uv[1] - 1.0).abs() < 1e-5);
        assert!(north.uv[1].abs() < 1e-5);
    }

    #[test]
    fn test_seam_column_duplicates_position_not_uv() {
        let mesh = generate_sphere(1.0, 16);
        let stride = 16 + 1;
        // Equator ring: first and last column share a position but differ in U.
        let ring = 4;
        let first = &mesh.vertices[ring * stride];
        let last = &mesh.vertices[ring * stride + 16];
        for axis in 0..3 {
            assert!((first.position[axis] - last.position[axis]).abs() < 1e-4);
        }
        assert!(first.uv[0].abs() < 1e-6);
        assert!((last.uv[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_same_level_same_radius_is_deterministic() {
        let a = generate_sphere(2.5, 20);
        let b = generate_sphere(2.5, 20);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
    }
}
