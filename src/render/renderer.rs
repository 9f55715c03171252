use anyhow::Result;
use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::core::frame_buffer::{FrameBuffer, Rgba};
use crate::core::surface::SurfaceSize;
use crate::math::{Color, Ray, AABB};
use crate::scene::{Material, MeshInstance, SceneGraph};

/// Draws the scene graph into a frame buffer
pub trait SceneRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera, frame: &mut FrameBuffer) -> Result<()>;
}

/// Color space of the renderer's output pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Linear,
    Srgb,
}

/// Linear to sRGB transfer for one channel
pub fn linear_to_srgb(value: f32) -> f32 {
    let v = value.clamp(0.0, 1.0);
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// CPU preview renderer that ray casts mesh bounding boxes
///
/// One ray is cast per `preview_scale` x `preview_scale` block and the hit
/// color fills the whole block.
#[derive(Debug, Clone)]
pub struct RaycastRenderer {
    pub clear_color: Color,
    pub clear_alpha: f32,
    pub preview_scale: u32,
    pub encoding: OutputEncoding,
    /// Direction light travels toward
    pub light_direction: Vec3,
    pub light_color: Color,
}

impl Default for RaycastRenderer {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            clear_alpha: 0.5,
            preview_scale: 4,
            encoding: OutputEncoding::Srgb,
            light_direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
            light_color: Color::new(0.6, 0.6, 0.6),
        }
    }
}

impl RaycastRenderer {
    pub fn new(clear_color: Color, clear_alpha: f32, preview_scale: u32) -> Self {
        Self {
            clear_color,
            clear_alpha,
            preview_scale: preview_scale.max(1),
            ..Default::default()
        }
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn encode(&self, color: Color, alpha: f32) -> Rgba {
        let color = match self.encoding {
            OutputEncoding::Linear => color,
            OutputEncoding::Srgb => Color::new(
                linear_to_srgb(color.r),
                linear_to_srgb(color.g),
                linear_to_srgb(color.b),
            ),
        };
        Rgba(color.to_rgba8(alpha))
    }

    /// Nearest mesh along the ray
    fn trace<'a>(ray: &Ray, meshes: &'a [MeshInstance]) -> Option<(f32, &'a MeshInstance)> {
        meshes
            .iter()
            .filter_map(|mesh| ray.intersect(&mesh.bounds).map(|t| (t, mesh)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn shade(&self, material: &Material, ambient: Color, bounds: &AABB, point: Vec3) -> Color {
        let mut base = material.base_color;
        if let Some(map) = material.map {
            base = base.scale(grid_pattern(bounds, point, map.offset, map.repeat));
        }
        if material.unlit {
            return base;
        }

        let normal = bounds.face_normal(point);
        let diffuse = normal.dot(-self.light_direction).max(0.0);
        let light = ambient.add(self.light_color.scale(diffuse));
        base.modulate(light).add(material.emissive)
    }
}

/// Checker pattern standing in for a color map; `offset` scrolls it
fn grid_pattern(bounds: &AABB, point: Vec3, offset: Vec2, repeat: Vec2) -> f32 {
    let size = bounds.size().max(Vec3::splat(f32::EPSILON));
    let local = (point - bounds.min) / size;
    // project onto the two largest axes of the box
    let (u, v) = if size.y <= size.x.min(size.z) {
        (local.x, local.z)
    } else if size.x <= size.z {
        (local.z, local.y)
    } else {
        (local.x, local.y)
    };
    let u = u * repeat.x * 8.0 + offset.x;
    let v = v * repeat.y * 8.0 + offset.y;
    if (u.rem_euclid(1.0) < 0.5) ^ (v.rem_euclid(1.0) < 0.5) {
        1.0
    } else {
        0.75
    }
}

impl SceneRenderer for RaycastRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera, frame: &mut FrameBuffer) -> Result<()> {
        let (width, height) = frame.dimensions();
        let surface = SurfaceSize::new(width, height);
        let step = self.preview_scale.max(1);
        let clear = self.encode(self.clear_color, self.clear_alpha);
        let ambient = scene.ambient_light();

        let meshes: Vec<MeshInstance> = scene
            .mesh_instances()
            .into_iter()
            .filter(|mesh| !mesh.bounds.is_empty())
            .collect();

        for y in (0..height).step_by(step as usize) {
            for x in (0..width).step_by(step as usize) {
                let center_x = (x + step / 2).min(width - 1) as f32 + 0.5;
                let center_y = (y + step / 2).min(height - 1) as f32 + 0.5;
                let ray = camera.ray_through_ndc(surface.to_ndc(center_x, center_y));

                let color = match Self::trace(&ray, &meshes) {
                    Some((t, mesh)) => match scene.materials.get(mesh.material) {
                        Some(material) => {
                            let shaded = self.shade(material, ambient, &mesh.bounds, ray.at(t));
                            self.encode(shaded, material.opacity)
                        }
                        None => clear,
                    },
                    None => clear,
                };
                frame.fill_block(x, y, step, step, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeKind, Transform};

    fn camera_looking_at_origin() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn test_empty_scene_is_cleared() {
        let mut renderer = RaycastRenderer::new(Color::from_hex(0x102030), 0.5, 4)
            .with_encoding(OutputEncoding::Linear);
        let mut frame = FrameBuffer::new(16, 16);
        renderer
            .render(&SceneGraph::new(), &camera_looking_at_origin(), &mut frame)
            .unwrap();

        assert_eq!(frame.pixel(0, 0), Some(Rgba([0x10, 0x20, 0x30, 128])));
        assert_eq!(frame.pixel(15, 15), Some(Rgba([0x10, 0x20, 0x30, 128])));
    }

    #[test]
    fn test_box_in_view_is_drawn() {
        let mut scene = SceneGraph::new();
        let material = scene
            .materials
            .add(Material::new("red", Color::new(1.0, 0.0, 0.0)).unlit());
        scene.add_node(
            scene.root(),
            "box",
            NodeKind::Mesh {
                bounds: AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
                material,
            },
            Transform::IDENTITY,
        );

        let mut renderer = RaycastRenderer::new(Color::BLACK, 0.5, 1);
        let mut frame = FrameBuffer::new(32, 32);
        renderer.render(&scene, &camera_looking_at_origin(), &mut frame).unwrap();

        assert_eq!(frame.pixel(16, 16), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(frame.pixel(0, 0).map(|p| p.alpha()), Some(128));
    }

    #[test]
    fn test_emissive_brightens_lit_material() {
        let renderer = RaycastRenderer::default();
        let bounds = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let plain = Material::new("grey", Color::new(0.2, 0.2, 0.2));
        let glowing = plain.clone().with_emissive(Color::new(0.5, 0.0, 0.0));

        let point = Vec3::new(0.0, 0.0, 1.0);
        let a = renderer.shade(&plain, Color::BLACK, &bounds, point);
        let b = renderer.shade(&glowing, Color::BLACK, &bounds, point);
        assert!(b.r > a.r);
        assert_eq!(a.g, b.g);
    }

    #[test]
    fn test_pattern_scrolls_with_offset() {
        let bounds = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        let point = Vec3::new(0.01, 0.0, 0.01);
        let still = grid_pattern(&bounds, point, Vec2::ZERO, Vec2::ONE);
        let scrolled = grid_pattern(&bounds, point, Vec2::new(0.0, 0.5), Vec2::ONE);
        assert_ne!(still, scrolled);
    }

    #[test]
    fn test_srgb_transfer() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
        assert!(linear_to_srgb(0.2) > 0.2);
    }
}
