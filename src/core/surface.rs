use glam::Vec2;

/// Renderer surface size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SurfaceSize {
    /// Zero dimensions are bumped to one so aspect and NDC math stay finite
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pixel position (origin top-left) to normalized device coordinates
    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x / self.width as f32) * 2.0 - 1.0,
            -(y / self.height as f32) * 2.0 + 1.0,
        )
    }

    /// Normalized device coordinates back to a pixel position
    pub fn from_ndc(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width as f32,
            (1.0 - ndc.y) * 0.5 * self.height as f32,
        )
    }
}
