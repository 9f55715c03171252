use glam::Vec3;

use super::AABB;

/// Half-line used for picking and for the preview renderer
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Direction is normalized so hit distances are in world units
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    pub fn intersect(&self, bounds: &AABB) -> Option<f32> {
        intersect_aabb(self.origin, self.direction, bounds.min, bounds.max)
    }
}

/// Slab test; returns the entry distance, or the exit distance when the origin is inside
pub fn intersect_aabb(ray_origin: Vec3, ray_dir: Vec3, box_min: Vec3, box_max: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-8;

    // Near-zero components are clamped so the slab stays finite
    let inv_dir = Vec3::new(
        if ray_dir.x.abs() < EPSILON { 1.0 / EPSILON.copysign(ray_dir.x) } else { 1.0 / ray_dir.x },
        if ray_dir.y.abs() < EPSILON { 1.0 / EPSILON.copysign(ray_dir.y) } else { 1.0 / ray_dir.y },
        if ray_dir.z.abs() < EPSILON { 1.0 / EPSILON.copysign(ray_dir.z) } else { 1.0 / ray_dir.z },
    );

    let t_min = (box_min - ray_origin) * inv_dir;
    let t_max = (box_max - ray_origin) * inv_dir;

    let t1 = t_min.min(t_max);
    let t2 = t_min.max(t_max);

    let t_near = t1.x.max(t1.y).max(t1.z);
    let t_far = t2.x.min(t2.y).min(t2.z);

    if t_near > t_far || t_far < 0.0 {
        return None;
    }

    if t_near < 0.0 {
        (t_far > 0.001).then_some(t_far)
    } else {
        Some(t_near)
    }
}
