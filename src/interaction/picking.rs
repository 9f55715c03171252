use glam::Vec3;

use crate::camera::PerspectiveCamera;
use crate::core::surface::SurfaceSize;
use crate::math::Ray;
use crate::scene::{NodeId, SceneGraph};

/// One mesh under the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

/// Ray from the camera through a pixel (origin top-left)
pub fn pointer_ray(camera: &PerspectiveCamera, surface: SurfaceSize, x: f32, y: f32) -> Ray {
    camera.ray_through_ndc(surface.to_ndc(x, y))
}

/// Every visible mesh the ray passes through, nearest first
pub fn intersect(scene: &SceneGraph, ray: &Ray) -> Vec<PickHit> {
    let mut hits: Vec<PickHit> = scene
        .mesh_instances()
        .into_iter()
        .filter_map(|mesh| {
            ray.intersect(&mesh.bounds).map(|distance| PickHit {
                node: mesh.node,
                distance,
                point: ray.at(distance),
            })
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Pick at a pixel position of a surface
pub fn pick(
    scene: &SceneGraph,
    camera: &PerspectiveCamera,
    surface: SurfaceSize,
    x: f32,
    y: f32,
) -> Vec<PickHit> {
    intersect(scene, &pointer_ray(camera, surface, x, y))
}
