/*
 *  vframebuf.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime sized pixel store backing the panel simulator
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::*;

/// A runtime-sized framebuffer for embedded-graphics.
///
/// Holds what a simulated panel's GDDRAM would show, row major.
#[derive(Debug, Clone)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn clear_color(&mut self, color: C) {
        self.buf.fill(color);
    }

    /// Pixel at (x, y), None off the surface
    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    /// Write one pixel, ignoring anything off the surface
    pub fn set_pixel(&mut self, x: usize, y: usize, color: C) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    /// One row of pixels, left to right
    pub fn row(&self, y: usize) -> &[C] {
        let start = (y.min(self.h)) * self.w;
        &self.buf[start..(start + self.w).min(self.buf.len())]
    }

    /// Number of pixels equal to `color`
    pub fn count(&self, color: C) -> usize {
        self.buf.iter().filter(|&&c| c == color).count()
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if p.x >= 0 && p.y >= 0 {
                self.set_pixel(p.x as usize, p.y as usize, c);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_pixel_access_bounds() {
        let mut fb = VarFrameBuf::new(4, 3, BinaryColor::Off);
        fb.set_pixel(3, 2, BinaryColor::On);
        fb.set_pixel(4, 0, BinaryColor::On);
        assert_eq!(fb.pixel(3, 2), Some(BinaryColor::On));
        assert_eq!(fb.pixel(4, 0), None);
        assert_eq!(fb.count(BinaryColor::On), 1);
        assert_eq!(fb.row(2), &[BinaryColor::Off, BinaryColor::Off, BinaryColor::Off, BinaryColor::On]);
    }

    #[test]
    fn test_draw_target_clips() {
        let mut fb = VarFrameBuf::new(8, 8, BinaryColor::Off);
        Rectangle::new(Point::new(6, 6), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.count(BinaryColor::On), 4);
        fb.clear(BinaryColor::Off).unwrap();
        assert_eq!(fb.count(BinaryColor::On), 0);
    }
}
