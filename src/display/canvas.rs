/*
 *  display/canvas.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawing primitives and text, streamed straight to the controller
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

//! There is no framebuffer. Every primitive arms one window on the
//! controller, streams a known number of pixels into it and closes the
//! transaction. Geometry is clipped to the surface first, so a stream never
//! runs past its window and nothing outside the surface is an error.
//!
//! Page addressed surfaces take packed 8-row columns rather than single
//! pixels, which shapes a few primitives: points and filled rectangles write
//! row masks (other rows of the touched pages are cleared), plain bitmaps
//! land on page boundaries, and rotated blits or raw color buffers are not
//! available.

use log::trace;

use crate::display::color::Color;
use crate::display::error::DisplayError;
use crate::display::factory::BoxedDriver;
use crate::display::font::{GlyphSource, FONT_6X8};
use crate::display::text::{Cursor, Decoded, Rotation, Utf8Decoder};
use crate::display::traits::{Addressing, ChipDriver};
use crate::display::window::PAGE_HEIGHT;

/// Drawing context bound to one display
pub struct Canvas {
    driver: BoxedDriver,
    color: Color,
    invert: bool,
    cursor: Cursor,
    rotation: Rotation,
    decoder: Utf8Decoder,
    font: &'static dyn GlyphSource,
}

/// Inclusive, clipped pixel rectangle
#[derive(Debug, Clone, Copy)]
struct Clip {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Clip {
    fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }
}

fn packed_len(width: u32, height: u32) -> usize {
    (width as usize).saturating_mul((height as usize).div_ceil(PAGE_HEIGHT as usize))
}

/// Bit for source pixel (col, row): bands of 8 rows, LSB on top
fn packed_bit(bitmap: &[u8], width: u32, col: u32, row: u32) -> bool {
    let index = (row / PAGE_HEIGHT * width + col) as usize;
    bitmap.get(index).is_some_and(|b| (b >> (row % PAGE_HEIGHT)) & 1 != 0)
}

/// Last coordinate of a `len` long run starting at `start`; `len` >= 1
fn far_edge(start: i32, len: u32) -> i32 {
    start.saturating_add(i32::try_from(len - 1).unwrap_or(i32::MAX))
}

/// Rows `top..=bottom` of a page as a packed mask
fn row_mask(top: u32, bottom: u32) -> u8 {
    (0xFFu8 << top) & (0xFFu8 >> (7 - bottom))
}

impl Canvas {
    pub fn new(driver: BoxedDriver) -> Self {
        Self {
            driver,
            color: Color::WHITE,
            invert: false,
            cursor: Cursor::default(),
            rotation: Rotation::Deg0,
            decoder: Utf8Decoder::new(),
            font: &FONT_6X8,
        }
    }

    /// Run the controller init table
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.driver.init()
    }

    pub fn driver(&self) -> &BoxedDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut BoxedDriver {
        &mut self.driver
    }

    pub fn into_driver(self) -> BoxedDriver {
        self.driver
    }

    pub fn set_addressing(&mut self, mode: Addressing) -> Result<(), DisplayError> {
        self.driver.set_addressing(mode)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.driver.dimensions()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_font(&mut self, font: &'static dyn GlyphSource) {
        self.font = font;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.color = Color::from_rgb(r, g, b);
    }

    /// Swap foreground and background in bitmap blits and text
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    /// Place the text cursor, pulled onto the surface
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Cursor { x, y };
        self.cursor.clamp_to(self.surface());
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    fn surface(&self) -> (i32, i32) {
        let (w, h) = self.driver.dimensions();
        (w as i32, h as i32)
    }

    fn clip(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Clip> {
        let (w, h) = self.surface();
        let (x0, x1) = (x1.min(x2).max(0), x1.max(x2).min(w - 1));
        let (y0, y1) = (y1.min(y2).max(0), y1.max(y2).min(h - 1));
        (x0 <= x1 && y0 <= y1).then(|| Clip {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    fn is_paged(&self) -> bool {
        self.driver.addressing() == Addressing::Pages
    }

    fn colors(&self) -> (Color, Color) {
        if self.invert {
            (Color::BLACK, self.color)
        } else {
            (self.color, Color::BLACK)
        }
    }

    /// Arm a window, run `body` against it and always close the transaction
    fn stream<F>(&mut self, x: u32, y: u32, width: u32, body: F) -> Result<(), DisplayError>
    where
        F: FnOnce(&mut dyn ChipDriver) -> Result<(), DisplayError>,
    {
        let driver: &mut dyn ChipDriver = &mut *self.driver;
        let result = match driver.set_block(x, y, width) {
            Ok(_) => body(&mut *driver),
            Err(e) => Err(e),
        };
        let ended = driver.end();
        result.and(ended)
    }

    fn plot(&mut self, x: i32, y: i32, color: Color) -> Result<(), DisplayError> {
        let Some(c) = self.clip(x, y, x, y) else {
            return Ok(());
        };
        if self.is_paged() {
            let bit = 1u8 << (c.y0 % PAGE_HEIGHT);
            self.stream(c.x0, c.y0 / PAGE_HEIGHT, 1, |d| d.send_pixels_packed(bit, color))
        } else {
            self.stream(c.x0, c.y0, 1, |d| d.send_pixel(color))
        }
    }

    pub fn put_pixel(&mut self, x: i32, y: i32) -> Result<(), DisplayError> {
        self.plot(x, y, self.color)
    }

    /// Horizontal line, both ends included
    pub fn draw_hline(&mut self, x1: i32, y: i32, x2: i32) -> Result<(), DisplayError> {
        self.fill_rect(x1, y, x2, y)
    }

    /// Vertical line, both ends included
    pub fn draw_vline(&mut self, x: i32, y1: i32, y2: i32) -> Result<(), DisplayError> {
        self.fill_rect(x, y1, x, y2)
    }

    /// Bresenham line, one transaction per pixel
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DisplayError> {
        let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let mut err = 0;

        if dy > dx {
            if y1 > y2 {
                std::mem::swap(&mut x1, &mut x2);
                std::mem::swap(&mut y1, &mut y2);
            }
            let step = if x1 < x2 { 1 } else { -1 };
            let mut x = x1;
            for y in y1..=y2 {
                self.put_pixel(x, y)?;
                err += dx;
                if err >= dy {
                    err -= dy;
                    x += step;
                }
            }
        } else {
            if x1 > x2 {
                std::mem::swap(&mut x1, &mut x2);
                std::mem::swap(&mut y1, &mut y2);
            }
            let step = if y1 < y2 { 1 } else { -1 };
            let mut y = y1;
            for x in x1..=x2 {
                self.put_pixel(x, y)?;
                err += dy;
                if err >= dx {
                    err -= dx;
                    y += step;
                }
            }
        }
        Ok(())
    }

    /// Outline rectangle
    ///
    /// Page surfaces get the whole outline in one stream, so edges sharing a
    /// page do not overwrite each other's rows.
    pub fn draw_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DisplayError> {
        if !self.is_paged() {
            self.draw_hline(x1, y1, x2)?;
            self.draw_hline(x1, y2, x2)?;
            self.draw_vline(x1, y1, y2)?;
            return self.draw_vline(x2, y1, y2);
        }

        let Some(c) = self.clip(x1, y1, x2, y2) else {
            return Ok(());
        };
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        let color = self.color;
        let (first, last) = (c.y0 / PAGE_HEIGHT, c.y1 / PAGE_HEIGHT);
        self.stream(c.x0, first, c.width(), |d| {
            for page in first..=last {
                if page != first {
                    d.next_page()?;
                }
                let base = page * PAGE_HEIGHT;
                let (lo, hi) = (c.y0.max(base), c.y1.min(base + 7));
                let edge = row_mask(lo - base, hi - base);
                let mut span = 0u8;
                for y in [top, bottom] {
                    if y >= lo as i32 && y <= hi as i32 {
                        span |= 1 << (y as u32 - base);
                    }
                }
                for sx in c.x0..=c.x1 {
                    let side = sx as i32 == left || sx as i32 == right;
                    d.send_pixels_packed(if side { edge } else { span }, color)?;
                }
            }
            Ok(())
        })
    }

    pub fn fill_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DisplayError> {
        self.fill_rect_with(x1, y1, x2, y2, self.color)
    }

    fn fill_rect_with(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) -> Result<(), DisplayError> {
        let Some(c) = self.clip(x1, y1, x2, y2) else {
            return Ok(());
        };
        let width = c.width();

        if !self.is_paged() {
            let count = width * c.height();
            trace!("fill {}x{} at ({}, {})", width, c.height(), c.x0, c.y0);
            return self.stream(c.x0, c.y0, width, |d| {
                for _ in 0..count {
                    d.send_pixel(color)?;
                }
                Ok(())
            });
        }

        let (first, last) = (c.y0 / PAGE_HEIGHT, c.y1 / PAGE_HEIGHT);
        self.stream(c.x0, first, width, |d| {
            for page in first..=last {
                if page != first {
                    d.next_page()?;
                }
                let base = page * PAGE_HEIGHT;
                let mask = row_mask(c.y0.max(base) - base, c.y1.min(base + 7) - base);
                for _ in 0..width {
                    d.send_pixels_packed(mask, color)?;
                }
            }
            Ok(())
        })
    }

    /// Blank a `width` x `height` region regardless of the current color
    pub fn clear_block(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<(), DisplayError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.fill_rect_with(x, y, far_edge(x, width), far_edge(y, height), Color::BLACK)
    }

    pub fn fill_screen(&mut self, color: Color) -> Result<(), DisplayError> {
        let (w, h) = self.surface();
        self.fill_rect_with(0, 0, w - 1, h - 1, color)
    }

    pub fn clear_screen(&mut self) -> Result<(), DisplayError> {
        self.fill_screen(Color::BLACK)
    }

    /// `fill_screen` with an RGB332 byte
    pub fn fill_screen8(&mut self, color: u8) -> Result<(), DisplayError> {
        self.fill_screen(Color::from_rgb332(color))
    }

    fn check_packed(bitmap: &[u8], width: u32, height: u32) -> Result<(), DisplayError> {
        let expected = packed_len(width, height);
        if bitmap.len() < expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: bitmap.len() });
        }
        Ok(())
    }

    /// Packed 1-bit bitmap, unrotated
    ///
    /// On page surfaces `y` is rounded down to the page it falls in.
    pub fn draw_bitmap(&mut self, x: i32, y: i32, width: u32, height: u32, bitmap: &[u8]) -> Result<(), DisplayError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        Self::check_packed(bitmap, width, height)?;
        if self.is_paged() {
            return self.draw_bitmap_paged(x, y, width, height, bitmap);
        }

        let Some(c) = self.clip(x, y, far_edge(x, width), far_edge(y, height)) else {
            return Ok(());
        };
        let (fg, bg) = self.colors();
        self.stream(c.x0, c.y0, c.width(), |d| {
            for sy in c.y0..=c.y1 {
                let row = (sy as i32 - y) as u32;
                for sx in c.x0..=c.x1 {
                    let col = (sx as i32 - x) as u32;
                    d.send_pixel(if packed_bit(bitmap, width, col, row) { fg } else { bg })?;
                }
            }
            Ok(())
        })
    }

    fn draw_bitmap_paged(&mut self, x: i32, y: i32, width: u32, height: u32, bitmap: &[u8]) -> Result<(), DisplayError> {
        let (w, h) = self.surface();
        let bands = height.div_ceil(PAGE_HEIGHT);
        let top_page = y.div_euclid(PAGE_HEIGHT as i32);
        let last_surface_page = (h - 1) / PAGE_HEIGHT as i32;

        let first = top_page.max(0);
        let last = far_edge(top_page, bands).min(last_surface_page);
        let x0 = x.max(0);
        let x1 = far_edge(x, width).min(w - 1);
        if first > last || x0 > x1 {
            return Ok(());
        }

        let color = self.color;
        let invert = self.invert;
        self.stream(x0 as u32, first as u32, (x1 - x0 + 1) as u32, |d| {
            for page in first..=last {
                if page != first {
                    d.next_page()?;
                }
                let band = (page - top_page) as u32;
                let rows_left = height - band * PAGE_HEIGHT;
                let valid = if rows_left >= PAGE_HEIGHT { 0xFF } else { row_mask(0, rows_left - 1) };
                for sx in x0..=x1 {
                    let index = band as usize * width as usize + (sx as i64 - x as i64) as usize;
                    let byte = bitmap.get(index).copied().unwrap_or(0);
                    let byte = if invert { !byte } else { byte };
                    d.send_pixels_packed(byte & valid, color)?;
                }
            }
            Ok(())
        })
    }

    /// Packed 1-bit bitmap walked with the rotation's step vectors, one
    /// single-pixel window per destination pixel
    pub fn draw_bitmap_rotated(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        bitmap: &[u8],
        rotation: Rotation,
    ) -> Result<(), DisplayError> {
        if self.is_paged() {
            return Err(DisplayError::UnsupportedOperation);
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        Self::check_packed(bitmap, width, height)?;

        let (fg, bg) = self.colors();
        let steps = rotation.blit_steps(width as i32);
        let (mut px, mut py) = (x, y);
        for row in 0..height {
            for col in 0..width {
                let color = if packed_bit(bitmap, width, col, row) { fg } else { bg };
                self.plot(px, py, color)?;
                px += steps.x_dx;
                py += steps.x_dy;
            }
            px += steps.y_dx;
            py += steps.y_dy;
        }
        Ok(())
    }

    /// Row-major block of colors, `width` per row
    pub fn draw_buffer(&mut self, x: i32, y: i32, width: u32, height: u32, pixels: &[Color]) -> Result<(), DisplayError> {
        self.draw_rows(x, y, width, height, pixels, |d, row| d.send_pixel_buffer(row))
    }

    /// Row-major block of RGB332 bytes, expanded to RGB565 on the way out
    pub fn draw_buffer8(&mut self, x: i32, y: i32, width: u32, height: u32, pixels: &[u8]) -> Result<(), DisplayError> {
        self.draw_rows(x, y, width, height, pixels, |d, row| {
            for &p in row {
                d.send_pixel(Color::from_rgb332(p))?;
            }
            Ok(())
        })
    }

    /// Clip a row-major source block and hand each visible row slice to `send`
    fn draw_rows<T, F>(&mut self, x: i32, y: i32, width: u32, height: u32, pixels: &[T], send: F) -> Result<(), DisplayError>
    where
        F: Fn(&mut dyn ChipDriver, &[T]) -> Result<(), DisplayError>,
    {
        if self.is_paged() {
            return Err(DisplayError::UnsupportedOperation);
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        let expected = (width as usize).saturating_mul(height as usize);
        if pixels.len() < expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: pixels.len() });
        }

        let Some(c) = self.clip(x, y, far_edge(x, width), far_edge(y, height)) else {
            return Ok(());
        };
        self.stream(c.x0, c.y0, c.width(), |d| {
            for sy in c.y0..=c.y1 {
                let start = (sy as i64 - y as i64) as usize * width as usize + (c.x0 as i64 - x as i64) as usize;
                send(&mut *d, &pixels[start..start + c.width() as usize])?;
            }
            Ok(())
        })
    }

    /// Feed one byte of text; returns the number of glyphs drawn (0 or 1)
    pub fn write_byte(&mut self, byte: u8) -> Result<usize, DisplayError> {
        let surface = self.surface();
        let metrics = self.font.metrics();

        if byte == b'\r' {
            self.decoder.reset();
            self.rotation.line_start(&mut self.cursor, surface);
            return Ok(0);
        }

        let newline = byte == b'\n';
        if newline || self.rotation.needs_wrap(self.cursor, surface, metrics.width as i32) {
            if newline {
                self.decoder.reset();
            }
            self.rotation.line_start(&mut self.cursor, surface);
            let band = self.rotation.next_line(&mut self.cursor, surface, metrics.height as i32);
            self.clear_block(band.x, band.y, band.width as u32, band.height as u32)?;
            if newline {
                return Ok(0);
            }
        }

        let ch = match self.decoder.feed(byte) {
            Decoded::Char(ch) => ch,
            Decoded::Pending | Decoded::Invalid => return Ok(0),
        };

        let font = self.font;
        let glyph = font.glyph(ch);
        let (w, h) = (glyph.width as u32, glyph.height as u32);
        let Cursor { x, y } = self.cursor;
        match self.rotation {
            Rotation::Deg0 => self.draw_bitmap(x, y, w, h, glyph.bitmap)?,
            rotation => self.draw_bitmap_rotated(x, y, w, h, glyph.bitmap, rotation)?,
        }
        self.rotation.advance(&mut self.cursor, (glyph.width + glyph.spacing) as i32, surface);
        Ok(1)
    }

    /// Write text at the cursor with the current rotation
    pub fn print(&mut self, text: &str) -> Result<usize, DisplayError> {
        self.print_bytes(text.as_bytes())
    }

    pub fn print_bytes(&mut self, bytes: &[u8]) -> Result<usize, DisplayError> {
        let mut drawn = 0;
        for &b in bytes {
            drawn += self.write_byte(b)?;
        }
        Ok(drawn)
    }

    pub fn print_fixed(&mut self, x: i32, y: i32, text: &str) -> Result<usize, DisplayError> {
        self.print_fixed_rotated(x, y, text, Rotation::Deg0)
    }

    /// Move the cursor, switch rotation and print
    pub fn print_fixed_rotated(&mut self, x: i32, y: i32, text: &str, rotation: Rotation) -> Result<usize, DisplayError> {
        self.set_cursor(x, y);
        self.rotation = rotation;
        self.print(text)
    }
}

#[cfg(all(test, feature = "driver-ssd1306", feature = "driver-ssd1351"))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::display::drivers::mock::{MockBus, MockBusState};
    use crate::display::drivers::ssd1306::Ssd1306Driver;
    use crate::display::drivers::ssd1351::Ssd1351Driver;
    use crate::display::simulator::{PanelKind, PanelSimulator};

    type State = Arc<Mutex<MockBusState>>;

    /// SSD1351 canvas, initialized, in the requested addressing
    fn color_canvas(addressing: Addressing) -> (Canvas, State) {
        let bus = MockBus::new();
        let state = bus.state();
        let mut canvas = Canvas::new(Box::new(Ssd1351Driver::new_128x128(bus)));
        canvas.init().unwrap();
        canvas.set_addressing(addressing).unwrap();
        (canvas, state)
    }

    fn mono_canvas() -> (Canvas, State) {
        let bus = MockBus::new();
        let state = bus.state();
        let mut canvas = Canvas::new(Box::new(Ssd1306Driver::new_128x64(bus)));
        canvas.init().unwrap();
        (canvas, state)
    }

    fn reset(state: &State) {
        state.lock().unwrap().clear_events();
    }

    fn simulate(state: &State, kind: PanelKind, width: u32, height: u32) -> PanelSimulator {
        let mut sim = PanelSimulator::new(kind, width, height);
        sim.replay(&state.lock().unwrap().events);
        sim
    }

    fn lit_pixels(sim: &PanelSimulator, width: u32, height: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if sim.lit(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_fill_rect_streams_area_in_one_window() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.fill_rect(10, 20, 14, 22).unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.start_count, 1);
        assert_eq!(guard.stop_count, 1);
        // four address bytes, then 5x3 pixels of two bytes each
        assert_eq!(guard.data_bytes().len(), 4 + 2 * 15);
        assert_eq!(guard.protocol_violations, 0);
    }

    #[test]
    fn test_fill_rect_pixels_land_in_place() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.set_color(Color::GREEN);
        canvas.fill_rect(14, 22, 10, 20).unwrap();

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.lit_count(), 15);
        assert_eq!(sim.pixel(10, 20), Some(Color::GREEN));
        assert_eq!(sim.pixel(14, 22), Some(Color::GREEN));
        assert!(!sim.lit(15, 22));
    }

    #[test]
    fn test_bresenham_shallow_line() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.draw_line(0, 0, 4, 2).unwrap();
        assert_eq!(state.lock().unwrap().transactions().len(), 5);

        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_line(0, 0, 4, 2).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(
            lit_pixels(&sim, 8, 8),
            vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 2)]
        );
    }

    #[test]
    fn test_bresenham_steep_and_reversed() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_line(2, 4, 0, 0).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(
            lit_pixels(&sim, 8, 8),
            vec![(0, 0), (0, 1), (1, 2), (1, 3), (2, 4)]
        );
    }

    #[test]
    fn test_point_round_trip_bytes() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.set_color(Color(0xBEEF));
        canvas.put_pixel(7, 9).unwrap();
        assert_eq!(state.lock().unwrap().data_bytes(), vec![7, 7, 9, 127, 0xBE, 0xEF]);
    }

    #[test]
    fn test_point_on_mono_panel() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.put_pixel(3, 10).unwrap();
        assert_eq!(state.lock().unwrap().data_bytes(), vec![0b0000_0100]);

        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(lit_pixels(&sim, 128, 64), vec![(3, 10)]);
    }

    #[test]
    fn test_off_surface_geometry_is_clipped() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.put_pixel(-1, 5).unwrap();
        canvas.put_pixel(5, 128).unwrap();
        canvas.fill_rect(200, 0, 300, 10).unwrap();
        assert_eq!(state.lock().unwrap().start_count, 0);

        canvas.fill_rect(120, 120, 140, 140).unwrap();
        let guard = state.lock().unwrap();
        assert_eq!(guard.data_bytes().len(), 4 + 2 * 64);
        assert_eq!(&guard.data_bytes()[..4], &[120, 127, 120, 127]);
    }

    #[test]
    fn test_lines_and_outline_rect() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_hline(2, 3, 6).unwrap();
        canvas.draw_vline(0, 10, 12).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.lit_count(), 5 + 3);
        assert!(sim.lit(6, 3) && sim.lit(0, 12));

        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.draw_rect(1, 1, 4, 3).unwrap();
        assert_eq!(state.lock().unwrap().transactions().len(), 4);
    }

    #[test]
    fn test_paged_fill_uses_row_masks() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.fill_rect(0, 4, 1, 11).unwrap();

        assert_eq!(state.lock().unwrap().data_bytes(), vec![0xF0, 0xF0, 0x0F, 0x0F]);
        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(sim.lit_count(), 16);
        assert!(sim.lit(1, 4) && sim.lit(1, 11) && !sim.lit(1, 12));
    }

    #[test]
    fn test_paged_fill_on_color_panel() {
        let (mut canvas, state) = color_canvas(Addressing::Pages);
        canvas.set_color(Color::RED);
        canvas.fill_rect(8, 6, 9, 9).unwrap();

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.lit_count(), 8);
        assert_eq!(sim.pixel(8, 6), Some(Color::RED));
        assert_eq!(sim.pixel(9, 9), Some(Color::RED));
        assert!(!sim.lit(8, 5));
    }

    #[test]
    fn test_bitmap_blit_and_invert() {
        // 3x2 arrow: columns 0b01, 0b11, 0b01
        let bitmap = [0b01, 0b11, 0b01];
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.draw_bitmap(20, 30, 3, 2, &bitmap).unwrap();
        assert_eq!(state.lock().unwrap().transactions().len(), 1);

        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_bitmap(20, 30, 3, 2, &bitmap).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(lit_pixels(&sim, 32, 32), vec![(20, 30), (21, 30), (22, 30), (21, 31)]);

        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.set_invert(true);
        canvas.draw_bitmap(20, 30, 3, 2, &bitmap).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(lit_pixels(&sim, 32, 32), vec![(20, 31), (22, 31)]);
    }

    #[test]
    fn test_bitmap_clipped_at_right_edge() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_bitmap(126, 0, 4, 8, &[0xFF; 4]).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.lit_count(), 16);
        // clipped stream must not wrap into the left of the next row
        assert!(!sim.lit(0, 1));
    }

    #[test]
    fn test_short_bitmap_rejected() {
        let (mut canvas, _) = color_canvas(Addressing::Rows);
        let result = canvas.draw_bitmap(0, 0, 4, 9, &[0; 4]);
        assert!(matches!(result, Err(DisplayError::BufferSizeMismatch { expected: 8, actual: 4 })));
    }

    #[test]
    fn test_paged_bitmap_aligns_to_page() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.draw_bitmap(5, 13, 2, 8, &[0x01, 0x80]).unwrap();

        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(lit_pixels(&sim, 128, 64), vec![(5, 8), (6, 15)]);
    }

    #[test]
    fn test_paged_surface_rejects_rotation_and_buffers() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        assert!(matches!(
            canvas.draw_bitmap_rotated(0, 0, 1, 8, &[0xFF], Rotation::Deg90),
            Err(DisplayError::UnsupportedOperation)
        ));
        assert!(matches!(
            canvas.draw_buffer(0, 0, 1, 1, &[Color::WHITE]),
            Err(DisplayError::UnsupportedOperation)
        ));
        assert!(matches!(
            canvas.draw_buffer8(0, 0, 1, 1, &[0xFF]),
            Err(DisplayError::UnsupportedOperation)
        ));
        assert_eq!(state.lock().unwrap().start_count, 0);
    }

    #[test]
    fn test_rotated_blit_one_window_per_pixel() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.draw_bitmap_rotated(50, 50, 2, 3, &[0b001, 0b100], Rotation::Deg90).unwrap();
        assert_eq!(state.lock().unwrap().transactions().len(), 6);

        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.draw_bitmap_rotated(50, 50, 2, 3, &[0b001, 0b100], Rotation::Deg90).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        // column 0 runs up from (50,50), rows step right
        assert_eq!(lit_pixels(&sim, 128, 128), vec![(52, 49), (50, 50)]);
    }

    #[test]
    fn test_draw_buffer_rows() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        let pixels = [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE];
        canvas.draw_buffer(127, 3, 2, 2, &pixels).unwrap();

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.pixel(127, 3), Some(Color::RED));
        assert_eq!(sim.pixel(127, 4), Some(Color::BLUE));
        assert_eq!(sim.lit_count(), 2);

        assert!(matches!(
            canvas.draw_buffer(0, 0, 2, 2, &pixels[..3]),
            Err(DisplayError::BufferSizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_rgb332_buffer_and_fill() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        canvas.draw_buffer8(0, 0, 2, 1, &[0xE0, 0x03]).unwrap();
        assert_eq!(state.lock().unwrap().data_bytes(), vec![0, 1, 0, 127, 0xE0, 0x00, 0x00, 0x18]);

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.pixel(0, 0), Some(Color(0xE000)));
        assert_eq!(sim.pixel(1, 0), Some(Color(0x0018)));
        assert_eq!(sim.lit_count(), 2);

        let (mut canvas, state) = color_canvas(Addressing::Pages);
        canvas.fill_screen8(0x1C).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert_eq!(sim.pixel(0, 0), Some(Color(0x0700)));
        assert_eq!(sim.pixel(127, 127), Some(Color(0x0700)));
    }

    #[test]
    fn test_oversized_widths_clip_to_surface() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.fill_screen(Color::WHITE).unwrap();
        canvas.clear_block(10, 0, u32::MAX, 1).unwrap();
        canvas.clear_block(100, 1, i32::MAX as u32, 1).unwrap();
        canvas.draw_bitmap(i32::MAX - 1, 0, 4, 8, &[0xFF; 4]).unwrap();

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert!(sim.lit(9, 0) && !sim.lit(10, 0) && !sim.lit(127, 0));
        assert!(sim.lit(99, 1) && !sim.lit(100, 1) && !sim.lit(127, 1));
        assert!(sim.lit(127, 2));

        assert!(matches!(
            canvas.draw_buffer(0, 0, u32::MAX, 2, &[Color::RED]),
            Err(DisplayError::BufferSizeMismatch { actual: 1, .. })
        ));

        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.draw_bitmap(120, 0, u32::MAX, 8, &[0xFF; 8]).unwrap_err();
        canvas.clear_block(120, 0, u32::MAX, 8).unwrap();
        assert_eq!(state.lock().unwrap().data_bytes(), vec![0; 8]);
    }

    #[test]
    fn test_paged_outline_keeps_shared_page() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.draw_rect(0, 0, 10, 3).unwrap();
        {
            let guard = state.lock().unwrap();
            assert_eq!(guard.transactions().len(), 1);
            let mut expected = vec![0x0F];
            expected.extend([0x09; 9]);
            expected.push(0x0F);
            assert_eq!(guard.data_bytes(), expected);
        }
        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(sim.lit_count(), 11 * 2 + 2 * 2);
        assert!((0..=10).all(|x| sim.lit(x, 0) && sim.lit(x, 3)));
        assert!((0..=3).all(|y| sim.lit(0, y) && sim.lit(10, y)));
        assert!(!sim.lit(5, 1) && !sim.lit(5, 2));

        // outline spanning two pages
        let (mut canvas, state) = mono_canvas();
        canvas.draw_rect(5, 12, 2, 4).unwrap();
        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(sim.lit_count(), 2 * 4 + 2 * 7);
        assert!(sim.lit(3, 4) && sim.lit(3, 12) && sim.lit(2, 8) && sim.lit(5, 7));
        assert!(!sim.lit(3, 8));
    }

    #[test]
    fn test_cursor_stays_on_surface() {
        let (mut canvas, _) = color_canvas(Addressing::Rows);
        canvas.set_cursor(-5, 300);
        assert_eq!(canvas.cursor(), Cursor { x: 0, y: 127 });

        // last glyph that fits parks the cursor on the right edge
        assert_eq!(canvas.print_fixed(122, 0, "A").unwrap(), 1);
        assert_eq!(canvas.cursor(), Cursor { x: 127, y: 0 });
        assert_eq!(canvas.print("B").unwrap(), 1);
        assert_eq!(canvas.cursor(), Cursor { x: 6, y: 8 });
    }

    #[test]
    fn test_fill_and_clear_screen() {
        let (mut canvas, state) = mono_canvas();
        reset(&state);
        canvas.fill_screen(Color::WHITE).unwrap();
        {
            let guard = state.lock().unwrap();
            assert_eq!(guard.data_bytes().len(), 128 * 8);
            assert!(guard.data_bytes().iter().all(|&b| b == 0xFF));
        }
        canvas.clear_screen().unwrap();
        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        assert_eq!(sim.lit_count(), 0);
    }

    #[test]
    fn test_text_wraps_once_after_21_glyphs() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        let drawn = canvas.print(&"A".repeat(22)).unwrap();
        assert_eq!(drawn, 22);
        assert_eq!(canvas.cursor(), Cursor { x: 6, y: 8 });

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        // 21st glyph starts at x = 120; the 22nd went to the next line
        assert!(sim.lit(121, 2));
        assert!(sim.lit(1, 10));
        assert!((0..8).all(|y| !sim.lit(127, y)));
    }

    #[test]
    fn test_carriage_return_keeps_line() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.set_cursor(0, 16);
        assert_eq!(canvas.print("AB\rC").unwrap(), 3);
        assert_eq!(canvas.cursor(), Cursor { x: 6, y: 16 });

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        // 'C' replaced 'A': column 1 is 0x3E, so row 6 of the line is dark
        assert!(sim.lit(1, 17));
        assert!(!sim.lit(1, 22));
        // 'B' survives
        assert!(sim.lit(7, 16));
    }

    #[test]
    fn test_newline_clears_band() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        canvas.fill_rect(0, 8, 127, 15).unwrap();
        assert_eq!(canvas.print("A\nB").unwrap(), 2);
        assert_eq!(canvas.cursor(), Cursor { x: 6, y: 8 });

        let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
        assert!(!sim.lit(100, 10));
    }

    #[test]
    fn test_utf8_text_feed() {
        let (mut canvas, _) = color_canvas(Addressing::Rows);
        assert_eq!(canvas.write_byte(0xE2).unwrap(), 0);
        assert_eq!(canvas.write_byte(0x82).unwrap(), 0);
        assert_eq!(canvas.write_byte(0xAC).unwrap(), 1);
        assert_eq!(canvas.cursor().x, 6);

        // broken sequence restarts on the next lead byte
        assert_eq!(canvas.print_bytes(&[0xC3, b'x']).unwrap(), 1);
        assert_eq!(canvas.print_bytes(&[0x80]).unwrap(), 0);
    }

    #[test]
    fn test_rotated_text_positions() {
        // 'A' column 1 is 0x7C: rows 2..=6 lit
        let cases = [
            (Rotation::Deg90, (0, 127), (2, 126), Cursor { x: 0, y: 121 }),
            (Rotation::Deg180, (127, 127), (126, 125), Cursor { x: 121, y: 127 }),
            (Rotation::Deg270, (127, 0), (125, 1), Cursor { x: 127, y: 6 }),
        ];
        for (rotation, (cx, cy), (px, py), after) in cases {
            let (mut canvas, state) = color_canvas(Addressing::Rows);
            assert_eq!(canvas.print_fixed_rotated(cx, cy, "A", rotation).unwrap(), 1);
            assert_eq!(canvas.cursor(), after, "{:?}", rotation);
            let sim = simulate(&state, PanelKind::Ssd1351, 128, 128);
            assert!(sim.lit(px, py), "{:?}", rotation);
            assert_eq!(sim.lit_count(), 16, "{:?}", rotation);
        }
    }

    #[test]
    fn test_rotated_text_wraps() {
        let (mut canvas, _) = color_canvas(Addressing::Rows);
        canvas.print_fixed_rotated(0, 5, "A", Rotation::Deg90).unwrap();
        assert_eq!(canvas.cursor(), Cursor { x: 8, y: 121 });
    }

    #[test]
    fn test_text_on_mono_panel() {
        let (mut canvas, state) = mono_canvas();
        assert_eq!(canvas.print_fixed(0, 8, "Hi").unwrap(), 2);
        let sim = simulate(&state, PanelKind::Ssd1306, 128, 64);
        // 'H' column 1 is 0x7F
        assert!((8..15).all(|y| sim.lit(1, y)));
        assert!(!sim.lit(1, 15));

        assert!(matches!(
            canvas.print_fixed_rotated(0, 63, "A", Rotation::Deg90),
            Err(DisplayError::UnsupportedOperation)
        ));
    }

    #[test]
    fn test_failed_stream_still_closes() {
        let (mut canvas, state) = color_canvas(Addressing::Rows);
        reset(&state);
        state.lock().unwrap().fail_after = Some(10);
        assert!(canvas.fill_rect(0, 0, 9, 9).is_err());
        let guard = state.lock().unwrap();
        assert_eq!(guard.start_count, guard.stop_count);
    }
}
