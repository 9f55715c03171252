//! Damped orbit rig that keeps the camera looking at a target point.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use crate::camera::PerspectiveCamera;

const EPS: f32 = 1e-6;

/// Orbit camera rig
///
/// - `rotate` / `rotate_pixels`: queue rotation around the target
/// - `dolly`: scale the distance to the target
/// - `update`: apply queued motion with damping and write the camera
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    /// Point to orbit around
    pub target: Vec3,
    pub enable_damping: bool,
    /// Fraction of queued rotation applied per update
    pub damping_factor: f32,
    /// Polar angle bounds measured from +Y, radians
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians of rotation per viewport height dragged
    pub rotate_speed: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 5.0, 0.0),
            enable_damping: true,
            damping_factor: 0.1,
            min_polar_angle: 0.0,
            max_polar_angle: FRAC_PI_2,
            min_distance: 10.0,
            max_distance: 100.0,
            rotate_speed: 1.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Queue rotation: `delta_theta` around +Y, `delta_phi` toward the pole
    pub fn rotate(&mut self, delta_theta: f32, delta_phi: f32) {
        self.pending_theta += delta_theta;
        self.pending_phi += delta_phi;
    }

    /// Queue rotation from a pointer drag measured in pixels
    pub fn rotate_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.rotate(
            -TAU * dx / height * self.rotate_speed,
            -TAU * dy / height * self.rotate_speed,
        );
    }

    /// Scale the orbit distance; values above 1 move away from the target
    pub fn dolly(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.pending_scale *= scale;
        }
    }

    /// True while queued rotation has not decayed yet
    pub fn is_moving(&self) -> bool {
        self.pending_theta.abs() > EPS || self.pending_phi.abs() > EPS
    }

    /// Apply queued motion, clamp the orbit and aim the camera at the target
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius < EPS {
            camera.look_at(self.target);
            return;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        if self.enable_damping {
            theta += self.pending_theta * self.damping_factor;
            phi += self.pending_phi * self.damping_factor;
        } else {
            theta += self.pending_theta;
            phi += self.pending_phi;
        }

        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        let radius = (radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.pending_theta *= 1.0 - self.damping_factor;
            self.pending_phi *= 1.0 - self.damping_factor;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
        }
        self.pending_scale = 1.0;
    }
}
