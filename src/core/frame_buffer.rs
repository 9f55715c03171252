use bytemuck::{Pod, Zeroable};

/// One RGBA8 pixel; a frame buffer is a tightly packed slice of these
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Source-over blend of `self` onto `dst`
    fn over(self, dst: Rgba) -> Rgba {
        let alpha = self.0[3] as u32;
        if alpha == 255 {
            return self;
        }
        if alpha == 0 {
            return dst;
        }

        let inv = 255 - alpha;
        let mix = |src: u8, dst: u8| ((src as u32 * alpha + dst as u32 * inv + 127) / 255) as u8;
        let out_alpha = alpha + (dst.0[3] as u32 * inv + 127) / 255;

        Rgba([
            mix(self.0[0], dst.0[0]),
            mix(self.0[1], dst.0[1]),
            mix(self.0[2], dst.0[2]),
            out_alpha.min(255) as u8,
        ])
    }
}

/// 2D drawing operations used by the overlay
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Fill entire buffer with color
    Clear(Rgba),

    /// Filled rectangle, blended over existing pixels
    Rect { x: i32, y: i32, width: u32, height: u32, color: Rgba },

    /// Circle outline using the midpoint algorithm
    Circle { cx: i32, cy: i32, radius: u32, color: Rgba },

    /// Filled circle
    FilledCircle { cx: i32, cy: i32, radius: u32, color: Rgba },

    /// Bresenham line
    Line { x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba },
}

/// CPU pixel buffer the renderer, composers and overlay draw into
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pixels: Vec<Rgba>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocate for a new size; contents are cleared
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![Rgba::TRANSPARENT; width as usize * height as usize];
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    /// Raw RGBA8 bytes, ready for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    /// Overwrite a pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = color;
        }
    }

    /// Blend a pixel over the existing content
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = color.over(self.pixels[index]);
        }
    }

    /// Overwrite a block of pixels, clipped to the buffer
    pub fn fill_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);

        for py in y..y_end {
            let row = (py * self.width) as usize;
            for px in x..x_end {
                self.pixels[row + px as usize] = color;
            }
        }
    }

    /// Execute a single draw operation
    pub fn draw(&mut self, op: &DrawOp) {
        match *op {
            DrawOp::Clear(color) => self.pixels.fill(color),
            DrawOp::Rect { x, y, width, height, color } => {
                for dy in 0..height as i32 {
                    for dx in 0..width as i32 {
                        self.blend_pixel(x + dx, y + dy, color);
                    }
                }
            }
            DrawOp::Circle { cx, cy, radius, color } => self.draw_circle(cx, cy, radius, color),
            DrawOp::FilledCircle { cx, cy, radius, color } => {
                let radius = radius as i32;
                let r_sq = radius * radius;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx * dx + dy * dy <= r_sq {
                            self.blend_pixel(cx + dx, cy + dy, color);
                        }
                    }
                }
            }
            DrawOp::Line { x1, y1, x2, y2, color } => self.draw_line(x1, y1, x2, y2, color),
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as u32 * self.width + x as u32) as usize)
    }

    fn draw_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgba) {
        let (mut x, mut y) = (radius as i32, 0i32);
        let mut p = 1 - radius as i32;

        while x >= y {
            let points = [
                (cx + x, cy + y), (cx - x, cy + y),
                (cx + x, cy - y), (cx - x, cy - y),
                (cx + y, cy + x), (cx - y, cy + x),
                (cx + y, cy - x), (cx - y, cy - x),
            ];
            for (px, py) in points {
                self.blend_pixel(px, py, color);
            }

            y += 1;
            if p <= 0 {
                p += 2 * y + 1;
            } else {
                x -= 1;
                p += 2 * (y - x) + 1;
            }
        }
    }

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba) {
        let (mut x, mut y) = (x1, y1);

        let dx = (x2 - x).abs();
        let dy = -(y2 - y).abs();
        let sx = if x < x2 { 1 } else { -1 };
        let sy = if y < y2 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend_pixel(x, y, color);

            if x == x2 && y == y2 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    #[test]
    fn test_clear_fills_every_pixel() {
        let mut buffer = FrameBuffer::new(4, 3);
        buffer.draw(&DrawOp::Clear(RED));
        assert!(buffer.pixels().iter().all(|&p| p == RED));
        assert_eq!(buffer.as_bytes().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_out_of_bounds_writes_are_ignored() {
        let mut buffer = FrameBuffer::new(2, 2);
        buffer.set_pixel(-1, 0, RED);
        buffer.set_pixel(2, 1, RED);
        assert!(buffer.pixels().iter().all(|&p| p == Rgba::TRANSPARENT));
    }

    #[test]
    fn test_half_alpha_blends() {
        let mut buffer = FrameBuffer::new(1, 1);
        buffer.set_pixel(0, 0, Rgba::new(0, 0, 0, 255));
        buffer.blend_pixel(0, 0, Rgba::new(255, 255, 255, 128));
        let pixel = buffer.pixel(0, 0).unwrap();
        assert!(pixel.0[0] > 120 && pixel.0[0] < 136);
        assert_eq!(pixel.alpha(), 255);
    }

    #[test]
    fn test_filled_circle_covers_center_only_within_radius() {
        let mut buffer = FrameBuffer::new(11, 11);
        buffer.draw(&DrawOp::FilledCircle { cx: 5, cy: 5, radius: 2, color: RED });
        assert_eq!(buffer.pixel(5, 5), Some(RED));
        assert_eq!(buffer.pixel(7, 5), Some(RED));
        assert_eq!(buffer.pixel(8, 5), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_line_reaches_both_ends() {
        let mut buffer = FrameBuffer::new(10, 10);
        buffer.draw(&DrawOp::Line { x1: 1, y1: 1, x2: 8, y2: 5, color: RED });
        assert_eq!(buffer.pixel(1, 1), Some(RED));
        assert_eq!(buffer.pixel(8, 5), Some(RED));
    }

    #[test]
    fn test_fill_block_is_clipped() {
        let mut buffer = FrameBuffer::new(3, 3);
        buffer.fill_block(2, 2, 5, 5, RED);
        assert_eq!(buffer.pixel(2, 2), Some(RED));
        assert_eq!(buffer.pixel(1, 1), Some(Rgba::TRANSPARENT));
    }
}
