//! Orbit camera: yaw/pitch/distance around a focus point.
//!
//! Input mapping lives in the app; this type only turns the orbit state into
//! view and projection matrices (reverse-Z).

use glam::{Mat4, Vec3};

use crate::pipeline::CameraUniform;

/// Camera orbiting a focus point at a given distance.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Point the camera looks at.
    pub focus: Vec3,
    /// Distance from the focus.
    pub distance: f32,
    /// Rotation around the world Y axis, radians.
    pub yaw: f32,
    /// Elevation angle, radians, clamped shy of the poles.
    pub pitch: f32,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

/// Pitch limit keeping the view matrix invertible at the poles.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

impl OrbitCamera {
    /// Camera at `distance` from the origin with a 45° field of view.
    pub fn new(distance: f32, aspect_ratio: f32) -> Self {
        Self {
            focus: Vec3::ZERO,
            distance,
            yaw: 0.0,
            pitch: 0.35,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.1,
            far: 10_000.0,
        }
    }

    /// Apply a yaw/pitch delta, clamping pitch away from the poles.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Multiplicative zoom with a minimum distance so the camera never
    /// enters a body.
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(1.0, 100_000.0);
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        self.aspect_ratio = width / height.max(1.0);
    }

    /// World-space camera position.
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.focus
            + Vec3::new(
                cos_pitch * cos_yaw,
                sin_pitch,
                cos_pitch * sin_yaw,
            ) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.focus, Vec3::Y)
    }

    /// Reverse-Z projection: near and far swapped so depth precision
    /// concentrates where the scene geometry is.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        let pos = self.position();
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: [pos.x, pos.y, pos.z, 0.0],
        }
    }

    /// Distance from the camera to a world-space point.
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position().distance(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_respects_distance() {
        let camera = OrbitCamera::new(200.0, 16.0 / 9.0);
        let pos = camera.position();
        assert!((pos.distance(camera.focus) - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_pitch_clamps_at_poles() {
        let mut camera = OrbitCamera::new(100.0, 1.0);
        camera.rotate(0.0, 10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        camera.rotate(0.0, -20.0);
        assert!(camera.pitch > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_zoom_clamps_minimum_distance() {
        let mut camera = OrbitCamera::new(2.0, 1.0);
        for _ in 0..100 {
            camera.zoom(0.5);
        }
        assert!(camera.distance >= 1.0);
    }

    #[test]
    fn test_view_looks_at_focus() {
        let camera = OrbitCamera::new(50.0, 1.0);
        let view = camera.view_matrix();
        // The focus maps onto the view axis: x and y vanish.
        let focus_view = view * camera.focus.extend(1.0);
        assert!(focus_view.x.abs() < 1e-3);
        assert!(focus_view.y.abs() < 1e-3);
        assert!(focus_view.z < 0.0, "focus should be in front of the camera");
    }

    #[test]
    fn test_distance_to_tracks_camera_motion() {
        let mut camera = OrbitCamera::new(100.0, 1.0);
        let d1 = camera.distance_to(Vec3::ZERO);
        camera.zoom(2.0);
        let d2 = camera.distance_to(Vec3::ZERO);
        assert!((d1 - 100.0).abs() < 1e-3);
        assert!((d2 - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_uniform_packs_position() {
        let camera = OrbitCamera::new(10.0, 1.0);
        let uniform = camera.to_uniform();
        let pos = camera.position();
        assert!((uniform.camera_pos[0] - pos.x).abs() < 1e-5);
        assert!((uniform.camera_pos[1] - pos.y).abs() < 1e-5);
        assert!((uniform.camera_pos[2] - pos.z).abs() < 1e-5);
    }
}
