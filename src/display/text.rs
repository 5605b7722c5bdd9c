/*
 *  display/text.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Cursor, rotation geometry and incremental UTF-8 decoding for text
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

//! Text runs along a *primary* axis and lines stack along a *secondary*
//! one. Which physical axis each is, and in which direction it grows,
//! depends on the rotation:
//!
//! | rotation | glyphs advance | lines advance |
//! |----------|----------------|---------------|
//! | 0°       | right (+x)     | down (+y)     |
//! | 90°      | up (-y)        | right (+x)    |
//! | 180°     | left (-x)      | up (-y)       |
//! | 270°     | down (+y)      | left (-x)     |

use crate::display::error::DisplayError;

/// Text and blit orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Text cursor, in pixels; always on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub x: i32,
    pub y: i32,
}

impl Cursor {
    /// Pull both coordinates onto the surface
    pub fn clamp_to(&mut self, surface: (i32, i32)) {
        let (w, h) = surface;
        self.x = self.x.clamp(0, (w - 1).max(0));
        self.y = self.y.clamp(0, (h - 1).max(0));
    }
}

/// Region cleared when a new text line begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Screen deltas while walking a packed bitmap
///
/// `(x_dx, x_dy)` is applied after every source column, `(y_dx, y_dy)` after
/// every source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitSteps {
    pub x_dx: i32,
    pub x_dy: i32,
    pub y_dx: i32,
    pub y_dy: i32,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Result<Self, DisplayError> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(DisplayError::InvalidRotation(other)),
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Reset the primary axis to the start of the line
    pub fn line_start(self, cursor: &mut Cursor, surface: (i32, i32)) {
        let (w, h) = surface;
        match self {
            Rotation::Deg0 => cursor.x = 0,
            Rotation::Deg90 => cursor.y = h - 1,
            Rotation::Deg180 => cursor.x = w - 1,
            Rotation::Deg270 => cursor.y = 0,
        }
    }

    /// A glyph `glyph_width` wide would not fit before the line ends
    pub fn needs_wrap(self, cursor: Cursor, surface: (i32, i32), glyph_width: i32) -> bool {
        let (w, h) = surface;
        match self {
            Rotation::Deg0 => cursor.x > w - glyph_width,
            Rotation::Deg90 => cursor.y < glyph_width,
            Rotation::Deg180 => cursor.x < glyph_width,
            Rotation::Deg270 => cursor.y > h - glyph_width,
        }
    }

    /// Step the secondary axis one line on, wrapping to the opposite edge,
    /// and return the band the new line occupies
    pub fn next_line(self, cursor: &mut Cursor, surface: (i32, i32), line_height: i32) -> Band {
        let (w, h) = surface;
        match self {
            Rotation::Deg0 => {
                cursor.y += line_height;
                if cursor.y > h - line_height {
                    cursor.y = 0;
                }
                Band { x: 0, y: cursor.y, width: w, height: line_height }
            }
            Rotation::Deg90 => {
                cursor.x += line_height;
                if cursor.x > w - line_height {
                    cursor.x = 0;
                }
                Band { x: cursor.x, y: 0, width: line_height, height: h }
            }
            Rotation::Deg180 => {
                cursor.y -= line_height;
                if cursor.y < line_height {
                    cursor.y = h - 1;
                }
                Band { x: 0, y: cursor.y + 1 - line_height, width: w, height: line_height }
            }
            Rotation::Deg270 => {
                cursor.x -= line_height;
                if cursor.x < line_height {
                    cursor.x = w - 1;
                }
                Band { x: cursor.x + 1 - line_height, y: 0, width: line_height, height: h }
            }
        }
    }

    /// Move the primary axis past a glyph, stopping at the surface edge
    ///
    /// A cursor parked on the edge always fails the next `needs_wrap` check,
    /// so the following glyph starts a new line.
    pub fn advance(self, cursor: &mut Cursor, step: i32, surface: (i32, i32)) {
        match self {
            Rotation::Deg0 => cursor.x = cursor.x.saturating_add(step),
            Rotation::Deg90 => cursor.y = cursor.y.saturating_sub(step),
            Rotation::Deg180 => cursor.x = cursor.x.saturating_sub(step),
            Rotation::Deg270 => cursor.y = cursor.y.saturating_add(step),
        }
        cursor.clamp_to(surface);
    }

    /// Traversal steps for a bitmap `width` columns wide
    pub fn blit_steps(self, width: i32) -> BlitSteps {
        let (x_dx, x_dy, y_dx, y_dy) = match self {
            Rotation::Deg0 => (1, 0, -width, 1),
            Rotation::Deg90 => (0, -1, 1, width),
            Rotation::Deg180 => (-1, 0, width, -1),
            Rotation::Deg270 => (0, 1, -1, -width),
        };
        BlitSteps { x_dx, x_dy, y_dx, y_dy }
    }
}

/// Outcome of feeding one byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Part of a multi-byte sequence, feed more
    Pending,
    Char(char),
    /// Byte cannot start a sequence, or the sequence was not a valid scalar
    Invalid,
}

/// Byte-at-a-time UTF-8 decoder
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    code: u32,
    needed: u8,
    len: u8,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_pending(&self) -> bool {
        self.needed > 0
    }

    pub fn feed(&mut self, byte: u8) -> Decoded {
        if self.needed > 0 {
            if byte & 0xC0 == 0x80 {
                self.code = (self.code << 6) | (byte & 0x3F) as u32;
                self.needed -= 1;
                return if self.needed == 0 { self.finish() } else { Decoded::Pending };
            }
            // broken sequence: drop it and read this byte afresh
            self.reset();
        }

        match byte {
            0x00..=0x7F => Decoded::Char(byte as char),
            0xC0..=0xDF => self.begin(byte & 0x1F, 1),
            0xE0..=0xEF => self.begin(byte & 0x0F, 2),
            0xF0..=0xF7 => self.begin(byte & 0x07, 3),
            _ => Decoded::Invalid,
        }
    }

    fn begin(&mut self, bits: u8, continuation: u8) -> Decoded {
        self.code = bits as u32;
        self.needed = continuation;
        self.len = continuation + 1;
        Decoded::Pending
    }

    fn finish(&mut self) -> Decoded {
        let min = match self.len {
            2 => 0x80,
            3 => 0x800,
            _ => 0x1_0000,
        };
        let code = self.code;
        self.reset();
        match char::from_u32(code) {
            Some(ch) if code >= min => Decoded::Char(ch),
            _ => Decoded::Invalid,
        }
    }
}
