use std::collections::BTreeSet;

use anyhow::Result;

use crate::frame::FrameInfo;
use crate::scene::{AnimationClip, MaterialId, NodeId, SceneGraph};

/// Texture offset added per tick
pub const SCROLL_STEP: f32 = 0.02;
/// Offset at which a scrolling texture jumps back to 0
pub const SCROLL_WRAP: f32 = 10_000.0;

/// What a mixin may touch during a tick
pub struct MixinContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub frame: FrameInfo,
}

/// Per-tick scene mutation, run before the frame is drawn
pub trait RenderMixin {
    fn update(&mut self, ctx: &mut MixinContext<'_>) -> Result<()>;
}

impl<F> RenderMixin for F
where
    F: FnMut(&mut MixinContext<'_>) -> Result<()>,
{
    fn update(&mut self, ctx: &mut MixinContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Scrolls the color map of a set of materials along V
#[derive(Debug, Clone)]
pub struct TextureScroll {
    materials: Vec<MaterialId>,
    step: f32,
    wrap: f32,
}

impl TextureScroll {
    pub fn new(materials: impl IntoIterator<Item = MaterialId>) -> Self {
        let unique: BTreeSet<MaterialId> = materials.into_iter().collect();
        Self {
            materials: unique.into_iter().collect(),
            step: SCROLL_STEP,
            wrap: SCROLL_WRAP,
        }
    }

    /// Scroll the mapped materials of every mesh under `nodes`
    ///
    /// Materials shared between meshes are advanced once per tick.
    pub fn for_nodes(scene: &SceneGraph, nodes: &[NodeId]) -> Self {
        let materials = nodes
            .iter()
            .flat_map(|node| scene.meshes_under(*node))
            .filter_map(|mesh| scene.node(mesh).and_then(|n| n.material()))
            .filter(|id| scene.materials.get(*id).is_some_and(|m| m.map.is_some()));
        Self::new(materials)
    }

    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl RenderMixin for TextureScroll {
    fn update(&mut self, ctx: &mut MixinContext<'_>) -> Result<()> {
        for id in &self.materials {
            let Some(map) = ctx.scene.materials.get_mut(*id).and_then(|m| m.map.as_mut()) else {
                continue;
            };
            if map.offset.y >= self.wrap {
                map.offset.y = 0.0;
            } else {
                map.offset.y += self.step;
            }
        }
        Ok(())
    }
}

/// Plays node animation clips on a loop
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self { clips, time: 0.0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}

impl RenderMixin for AnimationMixer {
    fn update(&mut self, ctx: &mut MixinContext<'_>) -> Result<()> {
        self.time += ctx.frame.delta_secs;
        for clip in &self.clips {
            let local = if clip.duration > 0.0 {
                self.time % clip.duration
            } else {
                0.0
            };
            clip.apply(local, ctx.scene);
        }
        Ok(())
    }
}
