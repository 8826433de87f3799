use std::fmt;

use shaderprog::Rgba;

/// Surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size as the `float2` a resolution uniform receives.
    pub fn as_resolution(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Record of one repaint, produced for logging and not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Time uniform value the frame was evaluated at, in seconds.
    pub timestamp: f32,
    pub surface_width: u32,
    pub surface_height: u32,
}

/// Unclamped RGBA pixels in row-major order, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    size: SurfaceSize,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    /// Wraps pixels produced row by row. `pixels` must hold exactly
    /// `width * height` entries.
    pub(crate) fn from_pixels(size: SurfaceSize, pixels: Vec<Rgba>) -> Self {
        debug_assert_eq!(pixels.len(), size.pixel_count());
        Self { size, pixels }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    /// Clamps and quantizes to tightly packed RGBA8 bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let quads: Vec<[u8; 4]> = self.pixels.iter().map(|pixel| pixel.to_rgba8()).collect();
        bytemuck::cast_slice::<[u8; 4], u8>(&quads).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_indexes_row_major_from_top_left() {
        let size = SurfaceSize::new(2, 2);
        let pixels = vec![
            Rgba::new(0.0, 0.0, 0.0, 1.0),
            Rgba::new(1.0, 0.0, 0.0, 1.0),
            Rgba::new(0.0, 1.0, 0.0, 1.0),
            Rgba::new(0.0, 0.0, 1.0, 1.0),
        ];
        let buffer = PixelBuffer::from_pixels(size, pixels);
        assert_eq!(buffer.get(1, 0), Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(buffer.get(0, 1), Some(Rgba::new(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(buffer.get(2, 0), None);
    }

    #[test]
    fn rgba8_conversion_clamps_out_of_range_channels() {
        let buffer = PixelBuffer::from_pixels(
            SurfaceSize::new(1, 1),
            vec![Rgba::new(1.125, -0.5, 0.5, 1.0)],
        );
        assert_eq!(buffer.to_rgba8(), vec![255, 0, 128, 255]);
    }
}
