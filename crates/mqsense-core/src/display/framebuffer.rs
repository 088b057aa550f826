//! 1-bit frame buffer in the e-paper panel's native layout.
//!
//! The summary screen is drawn into this RAM buffer, then the whole buffer is
//! shipped to the panel in one transfer. Rows are packed MSB-first, eight
//! pixels per byte; a set bit is white paper, a cleared bit is black ink.

use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Panel width in pixels (4.2" 400x300 e-paper)
pub const WIDTH_PX: u32 = 400;
/// Panel height in pixels
pub const HEIGHT_PX: u32 = 300;

const BYTES_PER_ROW: usize = WIDTH_PX as usize / 8;

/// Size of the packed buffer in bytes (400 x 300 / 8 = 15,000).
pub const BUFFER_LEN: usize = BYTES_PER_ROW * HEIGHT_PX as usize;

/// Packed 1-bpp frame buffer implementing `DrawTarget<Color = BinaryColor>`.
///
/// `BinaryColor::On` is ink (black), `BinaryColor::Off` is paper (white).
pub struct FrameBuffer {
    bytes: [u8; BUFFER_LEN],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// A blank (all white) buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; BUFFER_LEN],
        }
    }

    /// Packed bytes in the order the panel's RAM expects them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Color at `(x, y)`, or `None` outside the panel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= WIDTH_PX || y >= HEIGHT_PX {
            return None;
        }
        let (idx, mask) = Self::locate(x as usize, y as usize);
        Some(if self.bytes[idx] & mask != 0 {
            BinaryColor::Off
        } else {
            BinaryColor::On
        })
    }

    /// Number of inked pixels inside `area`.
    pub fn ink_count(&self, area: &Rectangle) -> usize {
        area.points()
            .filter(|p| {
                p.x >= 0 && p.y >= 0 && self.pixel(p.x as u32, p.y as u32) == Some(BinaryColor::On)
            })
            .count()
    }

    #[inline]
    fn locate(x: usize, y: usize) -> (usize, u8) {
        (y * BYTES_PER_ROW + x / 8, 0x80 >> (x % 8))
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let (idx, mask) = Self::locate(x, y);
        match color {
            BinaryColor::On => self.bytes[idx] &= !mask,
            BinaryColor::Off => self.bytes[idx] |= mask,
        }
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH_PX, HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (x, y) = (coord.x, coord.y);
            if x >= 0 && y >= 0 && (x as u32) < WIDTH_PX && (y as u32) < HEIGHT_PX {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = match color {
            BinaryColor::On => 0x00,
            BinaryColor::Off => 0xFF,
        };
        self.bytes.fill(fill);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn test_new_buffer_is_white() {
        let fb = FrameBuffer::new();
        assert_eq!(fb.as_bytes().len(), 15_000);
        assert!(fb.as_bytes().iter().all(|&b| b == 0xFF));
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(400, 0), None);
    }

    #[test]
    fn test_pixel_packing_is_msb_first() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(9, 1), BinaryColor::On).draw(&mut fb).unwrap();

        assert_eq!(fb.as_bytes()[0], 0b0111_1111);
        assert_eq!(fb.as_bytes()[BYTES_PER_ROW + 1], 0b1011_1111);
        assert_eq!(fb.pixel(9, 1), Some(BinaryColor::On));
    }

    #[test]
    fn test_out_of_bounds_pixels_are_ignored() {
        let mut fb = FrameBuffer::new();
        Line::new(Point::new(-10, -10), Point::new(310, 310))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(299, 299), Some(BinaryColor::On));
    }

    #[test]
    fn test_fill_solid_clamps_to_panel() {
        let mut fb = FrameBuffer::new();
        fb.fill_solid(
            &Rectangle::new(Point::new(390, 290), Size::new(50, 50)),
            BinaryColor::On,
        )
        .unwrap();

        let corner = Rectangle::new(Point::new(390, 290), Size::new(10, 10));
        assert_eq!(fb.ink_count(&corner), 100);
        assert_eq!(fb.ink_count(&fb.bounding_box()), 100);
    }

    #[test]
    fn test_clear() {
        let mut fb = FrameBuffer::new();
        fb.clear(BinaryColor::On).unwrap();
        assert!(fb.as_bytes().iter().all(|&b| b == 0x00));
        fb.clear(BinaryColor::Off).unwrap();
        assert!(fb.as_bytes().iter().all(|&b| b == 0xFF));
    }
}
