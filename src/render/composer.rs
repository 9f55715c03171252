use anyhow::Result;

use super::renderer::{linear_to_srgb, SceneRenderer};
use crate::camera::PerspectiveCamera;
use crate::core::frame_buffer::FrameBuffer;
use crate::scene::SceneGraph;

/// What a composer gets to draw with on each tick
pub struct ComposeTarget<'a> {
    pub scene: &'a SceneGraph,
    pub camera: &'a PerspectiveCamera,
    pub frame: &'a mut FrameBuffer,
}

/// A render pipeline that replaces the default renderer while registered
pub trait Composer {
    fn render(&mut self, target: &mut ComposeTarget<'_>, delta_secs: f32) -> Result<()>;
}

impl<F> Composer for F
where
    F: FnMut(&mut ComposeTarget<'_>, f32) -> Result<()>,
{
    fn render(&mut self, target: &mut ComposeTarget<'_>, delta_secs: f32) -> Result<()> {
        self(target, delta_secs)
    }
}

/// Full-frame image operation applied after the base render
pub trait PostPass {
    fn name(&self) -> &str;
    fn apply(&mut self, frame: &mut FrameBuffer, delta_secs: f32) -> Result<()>;
}

/// Base scene render followed by post passes, in order
pub struct PassComposer {
    base: Box<dyn SceneRenderer>,
    passes: Vec<Box<dyn PostPass>>,
}

impl PassComposer {
    pub fn new(base: impl SceneRenderer + 'static) -> Self {
        Self {
            base: Box::new(base),
            passes: Vec::new(),
        }
    }

    pub fn add_pass(mut self, pass: impl PostPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }
}

impl Composer for PassComposer {
    fn render(&mut self, target: &mut ComposeTarget<'_>, delta_secs: f32) -> Result<()> {
        self.base.render(target.scene, target.camera, target.frame)?;
        for pass in &mut self.passes {
            pass.apply(target.frame, delta_secs)?;
        }
        Ok(())
    }
}

/// Encodes linear pixels as sRGB, leaving alpha untouched
#[derive(Debug, Clone)]
pub struct SrgbEncodePass {
    table: [u8; 256],
}

impl Default for SrgbEncodePass {
    fn default() -> Self {
        let mut table = [0u8; 256];
        for (value, slot) in table.iter_mut().enumerate() {
            *slot = (linear_to_srgb(value as f32 / 255.0) * 255.0).round() as u8;
        }
        Self { table }
    }
}

impl PostPass for SrgbEncodePass {
    fn name(&self) -> &str {
        "srgb-encode"
    }

    fn apply(&mut self, frame: &mut FrameBuffer, _delta_secs: f32) -> Result<()> {
        for pixel in frame.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            pixel.0 = [
                self.table[r as usize],
                self.table[g as usize],
                self.table[b as usize],
                a,
            ];
        }
        Ok(())
    }
}
