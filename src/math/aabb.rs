use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in whatever space its owner works in
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any union or point extension replaces
    pub const EMPTY: AABB = AABB {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn extend(&self, point: Vec3) -> AABB {
        AABB {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Bounds of this box after an affine transform (all eight corners)
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        if self.is_empty() {
            return *self;
        }

        (0..8).fold(AABB::EMPTY, |bounds, corner| {
            let point = Vec3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            bounds.extend(matrix.transform_point3(point))
        })
    }

    /// Outward normal of the face closest to a point on the surface
    pub fn face_normal(&self, point: Vec3) -> Vec3 {
        let candidates = [
            ((point.x - self.min.x).abs(), Vec3::NEG_X),
            ((point.x - self.max.x).abs(), Vec3::X),
            ((point.y - self.min.y).abs(), Vec3::NEG_Y),
            ((point.y - self.max.y).abs(), Vec3::Y),
            ((point.z - self.min.z).abs(), Vec3::NEG_Z),
            ((point.z - self.max.z).abs(), Vec3::Z),
        ];

        candidates
            .iter()
            .fold((f32::INFINITY, Vec3::Y), |best, &(distance, normal)| {
                if distance < best.0 {
                    (distance, normal)
                } else {
                    best
                }
            })
            .1
    }
}
