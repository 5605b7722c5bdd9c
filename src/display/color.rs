/*
 *  display/color.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Packed 16-bit colors and the fixed conversion formulas
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

use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::{BinaryColor, Rgb565};
use embedded_graphics::prelude::*;

/// Packed RGB565 color value
///
/// On monochrome surfaces any nonzero value lights the pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Color(pub u16);

impl Color {
    pub const BLACK: Color = Color(0x0000);
    pub const WHITE: Color = Color(0xFFFF);
    pub const RED: Color = Color(0xF800);
    pub const GREEN: Color = Color(0x07E0);
    pub const BLUE: Color = Color(0x001F);
    pub const YELLOW: Color = Color(0xFFE0);

    /// Truncating 8-8-8 to 5-6-5 packing
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }

    /// Expand a 3-3-2 byte into RGB565, low bits zero filled
    pub const fn from_rgb332(c: u8) -> Self {
        let c = c as u16;
        Color(((c & 0xE0) << 8) | ((c & 0x1C) << 6) | ((c & 0x03) << 3))
    }

    /// Pack 8-8-8 components into a 3-3-2 byte
    pub const fn rgb332(r: u8, g: u8, b: u8) -> u8 {
        (r & 0xE0) | ((g >> 3) & 0x1C) | (b >> 6)
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Bus byte order: high byte first
    pub const fn to_be_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn is_on(&self) -> bool {
        self.0 != 0
    }

    pub fn to_binary(&self) -> BinaryColor {
        if self.is_on() { BinaryColor::On } else { BinaryColor::Off }
    }
}

impl From<u16> for Color {
    fn from(raw: u16) -> Self {
        Color(raw)
    }
}

impl From<Rgb565> for Color {
    fn from(c: Rgb565) -> Self {
        Color(c.into_storage())
    }
}

impl From<Color> for Rgb565 {
    fn from(c: Color) -> Self {
        Rgb565::from(RawU16::new(c.0))
    }
}

impl From<BinaryColor> for Color {
    fn from(c: BinaryColor) -> Self {
        if c.is_on() { Color::WHITE } else { Color::BLACK }
    }
}
