use glam::Vec3;

use crate::camera::PerspectiveCamera;
use crate::core::frame_buffer::{DrawOp, FrameBuffer, Rgba};
use crate::core::surface::SurfaceSize;
use crate::scene::{NodeId, SceneGraph};

const MARKER_RADIUS: u32 = 4;
const MARKER_COLOR: Rgba = Rgba::new(255, 255, 255, 230);
const STEM_COLOR: Rgba = Rgba::new(255, 255, 255, 160);
const STEM_HEIGHT: u32 = 12;

/// Where a label is pinned in the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelAnchor {
    World(Vec3),
    /// Follows a node; the offset is in world units from the node origin
    Node(NodeId, Vec3),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub anchor: LabelAnchor,
}

impl Label {
    pub fn at(text: impl Into<String>, position: Vec3) -> Self {
        Self {
            text: text.into(),
            anchor: LabelAnchor::World(position),
        }
    }

    pub fn on_node(text: impl Into<String>, node: NodeId, offset: Vec3) -> Self {
        Self {
            text: text.into(),
            anchor: LabelAnchor::Node(node, offset),
        }
    }

    fn world_position(&self, scene: &SceneGraph) -> Option<Vec3> {
        match self.anchor {
            LabelAnchor::World(position) => Some(position),
            LabelAnchor::Node(node, offset) => {
                if scene.node(node).is_none() || !scene.is_visible(node) {
                    return None;
                }
                Some(scene.world_matrix(node).transform_point3(Vec3::ZERO) + offset)
            }
        }
    }
}

/// A label resolved to pixel coordinates for this frame
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Projects labels onto the frame every tick
#[derive(Debug, Clone, Default)]
pub struct LabelOverlay {
    labels: Vec<Label>,
    pub draw_markers: bool,
}

impl LabelOverlay {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            draw_markers: true,
        }
    }

    pub fn add(&mut self, label: Label) -> usize {
        self.labels.push(label);
        self.labels.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<Label> {
        (index < self.labels.len()).then(|| self.labels.remove(index))
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    /// Place every visible label and draw its marker into `frame`
    pub fn render(
        &self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
        frame: &mut FrameBuffer,
    ) -> Vec<LabelPlacement> {
        let (width, height) = frame.dimensions();
        let surface = SurfaceSize::new(width, height);

        let placements: Vec<LabelPlacement> = self
            .labels
            .iter()
            .filter_map(|label| {
                let world = label.world_position(scene)?;
                let pixel = surface.from_ndc(camera.project(world)?);
                Some(LabelPlacement {
                    text: label.text.clone(),
                    x: pixel.x,
                    y: pixel.y,
                })
            })
            .collect();

        if self.draw_markers {
            for placement in &placements {
                let (cx, cy) = (placement.x as i32, placement.y as i32);
                frame.draw(&DrawOp::Rect {
                    x: cx,
                    y: cy - STEM_HEIGHT as i32,
                    width: 1,
                    height: STEM_HEIGHT,
                    color: STEM_COLOR,
                });
                frame.draw(&DrawOp::FilledCircle {
                    cx,
                    cy,
                    radius: MARKER_RADIUS,
                    color: MARKER_COLOR,
                });
            }
        }

        placements
    }
}
