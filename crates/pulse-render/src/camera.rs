//! Fixed camera looking at a globe that spins about the Y axis.

use glam::{Mat4, Vec3};

/// Camera at a fixed eye position; the globe's model transform carries the
/// animation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Spin rate in radians per second of animation time.
    pub angular_speed: f32,
    /// Spin angle at time zero, in radians.
    pub phase: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.3, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            angular_speed: -0.2 * 0.75,
            phase: 1.5,
        }
    }
}

impl OrbitCamera {
    /// Perspective projection with depth mapped to [0, 1], near at 0.
    /// A zero-height viewport falls back to an aspect of 1.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Globe rotation at animation time `cur_time` (seconds).
    pub fn model(&self, cur_time: f32) -> Mat4 {
        Mat4::from_rotation_y(self.angular_speed * cur_time + self.phase)
    }

    pub fn mvp(&self, aspect: f32, cur_time: f32) -> Mat4 {
        self.projection(aspect) * self.view() * self.model(cur_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_defaults() {
        let camera = OrbitCamera::default();
        assert_eq!(camera.eye, Vec3::new(0.0, 1.3, 3.0));
        assert!((camera.fov_y.to_degrees() - 45.0).abs() < 1e-4);
        assert!((camera.angular_speed + 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_model_rotates_about_y() {
        let camera = OrbitCamera {
            angular_speed: 1.0,
            phase: 0.0,
            ..OrbitCamera::default()
        };
        let quarter = camera.model(std::f32::consts::FRAC_PI_2);
        assert!(approx(quarter.transform_point3(Vec3::X), Vec3::NEG_Z));
        assert!(approx(quarter.transform_point3(Vec3::Y), Vec3::Y));
    }

    #[test]
    fn test_phase_applies_at_time_zero() {
        let camera = OrbitCamera::default();
        let expected = Mat4::from_rotation_y(1.5);
        assert!(camera.model(0.0).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_globe_centre_projects_inside_depth_range() {
        let camera = OrbitCamera::default();
        let clip = camera.mvp(1.0, 3.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_near_side_is_closer_than_far_side() {
        let camera = OrbitCamera::default();
        let mvp = camera.mvp(1.0, 0.0);
        let toward_eye = camera.eye.normalize();
        let depth = |p: Vec3| {
            let clip = mvp * p.extend(1.0);
            clip.z / clip.w
        };
        let near = camera.model(0.0).inverse().transform_point3(toward_eye);
        let far = camera.model(0.0).inverse().transform_point3(-toward_eye);
        assert!(depth(near) < depth(far));
    }

    #[test]
    fn test_degenerate_aspect_falls_back() {
        let camera = OrbitCamera::default();
        assert_eq!(camera.projection(0.0), camera.projection(1.0));
        assert_eq!(camera.projection(f32::NAN), camera.projection(1.0));
    }
}
