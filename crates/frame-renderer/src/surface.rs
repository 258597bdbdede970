//! Drawing surfaces

use image::RgbaImage;

/// Persistent target the renderer paints onto
pub trait DrawingSurface: Send {
    /// Current (width, height) in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Reallocate to a new size; previous contents are discarded
    fn resize(&mut self, width: u32, height: u32);

    /// Paint a bitmap at (0, 0), replacing whatever was there
    fn draw(&mut self, bitmap: &RgbaImage);

    /// Free backing storage
    fn release(&mut self);
}

/// In-memory RGBA surface
#[derive(Debug, Default)]
pub struct CanvasSurface {
    width: u32,
    height: u32,
    /// RGBA pixel data (width * height * 4)
    pixels: Vec<u8>,
    resize_count: u64,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of times the surface was reallocated
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl DrawingSurface for CanvasSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width as usize) * (height as usize) * 4];
        self.resize_count += 1;
    }

    fn draw(&mut self, bitmap: &RgbaImage) {
        if bitmap.dimensions() == (self.width, self.height) {
            self.pixels.copy_from_slice(bitmap.as_raw());
            return;
        }

        // Size mismatch: copy the overlapping region row by row
        let cols = bitmap.width().min(self.width) as usize * 4;
        let rows = bitmap.height().min(self.height) as usize;
        let src_stride = bitmap.width() as usize * 4;
        let dst_stride = self.width as usize * 4;
        let src = bitmap.as_raw();
        for row in 0..rows {
            let s = row * src_stride;
            let d = row * dst_stride;
            self.pixels[d..d + cols].copy_from_slice(&src[s..s + cols]);
        }
    }

    fn release(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels = Vec::new();
    }
}
