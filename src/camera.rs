use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

use crate::controls::OrbitControls;
use crate::math::Ray;
use crate::tween::Interpolate;

pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
pub const DEFAULT_NEAR: f32 = 1.0;
pub const DEFAULT_FAR: f32 = 10_000.0;

/// Camera position plus the point it looks at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub const fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    /// Starting viewpoint of the substation overview
    pub const HOME: CameraPose = CameraPose::new(Vec3::new(20.0, 15.0, 20.0), Vec3::new(0.0, 5.0, 0.0));
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::HOME
    }
}

impl Interpolate for CameraPose {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        Self {
            position: self.position.interpolate(&end.position, t),
            target: self.target.interpolate(&end.target, t),
        }
    }
}

/// Right-handed perspective camera with a GL depth range
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    look_target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            position: CameraPose::HOME.position,
            fov_degrees: DEFAULT_FOV_DEGREES,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            aspect: aspect.max(f32::EPSILON),
            look_target: Vec3::ZERO,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(f32::EPSILON);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.look_target = target;
    }

    pub fn look_target(&self) -> Vec3 {
        self.look_target
    }

    pub fn forward(&self) -> Vec3 {
        (self.look_target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or(Vec3::X)
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the eye through a point in normalized device coordinates
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let far = far.xyz() / far.w;
        Ray::new(self.position, far - self.position)
    }

    /// Project a world point into normalized device coordinates
    ///
    /// Returns `None` for points behind the camera or outside the view.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let inside = ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && ndc.z.abs() <= 1.0;
        inside.then(|| ndc.truncate())
    }
}

/// The camera and control rig the tour and highlight tweens write into
#[derive(Debug, Clone)]
pub struct ViewState {
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
}

impl ViewState {
    pub fn new(aspect: f32, home: CameraPose) -> Self {
        let mut state = Self {
            camera: PerspectiveCamera::new(aspect),
            controls: OrbitControls::default(),
        };
        state.apply_pose(&home);
        state
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.camera.position, self.controls.target)
    }

    /// Move the camera and control target, then let the rig recompute
    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.camera.position = pose.position;
        self.controls.target = pose.target;
        self.controls.update(&mut self.camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let camera = PerspectiveCamera::new(16.0 / 9.0);
        assert_eq!(camera.fov_degrees, 45.0);
        assert_eq!(camera.near, 1.0);
        assert_eq!(camera.far, 10_000.0);
        assert_eq!(camera.position, Vec3::new(20.0, 15.0, 20.0));
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.look_at(Vec3::ZERO);

        let ray = camera.ray_through_ndc(Vec2::ZERO);
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn test_project_center_and_behind() {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.look_at(Vec3::ZERO);

        let center = camera.project(Vec3::ZERO).unwrap();
        assert!(center.abs_diff_eq(Vec2::ZERO, 1e-5));
        assert!(camera.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
        assert!(camera.project(Vec3::new(500.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_pose_interpolation() {
        let a = CameraPose::new(Vec3::ZERO, Vec3::ZERO);
        let b = CameraPose::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0));
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(mid.target, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_pose_json_shape() {
        let pose: CameraPose =
            serde_json::from_str(r#"{"position":[1,2,3],"target":[4,5,6]}"#).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.target, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_view_state_round_trips_pose() {
        let state = ViewState::new(1.0, CameraPose::HOME);
        assert_eq!(state.pose().target, CameraPose::HOME.target);
        assert!(state.pose().position.abs_diff_eq(CameraPose::HOME.position, 1e-3));
    }
}
