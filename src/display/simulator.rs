/*
 *  display/simulator.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Replays recorded bus traffic into a simulated controller RAM
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

//! Only the commands the drivers in this crate emit are modelled: window
//! addressing, RAM writes, the SSD1351 increment direction and inversion.
//! Everything else is parsed for its argument count and ignored.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

use crate::display::color::Color;
use crate::display::drivers::mock::BusEvent;
use crate::display::traits::{BusMode, ColorDepth};
use crate::vframebuf::VarFrameBuf;

/// Controller command set to emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Ssd1306,
    Ssd1351,
}

impl From<ColorDepth> for PanelKind {
    fn from(depth: ColorDepth) -> Self {
        match depth {
            ColorDepth::Monochrome => PanelKind::Ssd1306,
            ColorDepth::Rgb565 => PanelKind::Ssd1351,
        }
    }
}

/// Software model of a panel's display RAM
#[derive(Debug, Clone)]
pub struct PanelSimulator {
    kind: PanelKind,
    fb: VarFrameBuf<Rgb565>,

    mode: BusMode,
    command: Option<u8>,
    args: Vec<u8>,

    /// Armed window, columns and rows (pages on the SSD1306), inclusive
    cols: (u32, u32),
    rows: (u32, u32),

    /// Write pointer
    x: u32,
    y: u32,

    vertical: bool,
    high_byte: Option<u8>,
    inverted: bool,
}

impl PanelSimulator {
    pub fn new(kind: PanelKind, width: u32, height: u32) -> Self {
        let rows = match kind {
            PanelKind::Ssd1306 => (0, height.saturating_sub(1) / 8),
            PanelKind::Ssd1351 => (0, height.saturating_sub(1)),
        };
        Self {
            kind,
            fb: VarFrameBuf::new(width, height, Rgb565::BLACK),
            mode: BusMode::Command,
            command: None,
            args: Vec::new(),
            cols: (0, width.saturating_sub(1)),
            rows,
            x: 0,
            y: 0,
            vertical: false,
            high_byte: None,
            inverted: false,
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn framebuffer(&self) -> &VarFrameBuf<Rgb565> {
        &self.fb
    }

    /// Whether the last inversion command selected inverse video
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.fb.pixel(x as usize, y as usize).map(Color::from)
    }

    /// True when the pixel holds anything but black
    pub fn lit(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y).is_some_and(|c| c.is_on())
    }

    /// Number of non-black pixels
    pub fn lit_count(&self) -> usize {
        self.fb.as_slice().len() - self.fb.count(Rgb565::BLACK)
    }

    pub fn replay(&mut self, events: &[BusEvent]) {
        for &event in events {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: BusEvent) {
        match event {
            BusEvent::Start | BusEvent::Stop => self.high_byte = None,
            BusEvent::Mode(mode) => self.mode = mode,
            BusEvent::Byte(b) => match (self.kind, self.mode) {
                (PanelKind::Ssd1351, BusMode::Command) => {
                    self.command = Some(b);
                    self.args.clear();
                    self.high_byte = None;
                    self.ssd1351_command(b);
                }
                (PanelKind::Ssd1351, BusMode::Data) => self.ssd1351_data(b),
                (PanelKind::Ssd1306, BusMode::Command) => self.ssd1306_command(b),
                (PanelKind::Ssd1306, BusMode::Data) => self.ssd1306_data(b),
            },
        }
    }

    /// One character per pixel, `#` for lit, one line per row
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.fb.width() + 1) * self.fb.height());
        for y in 0..self.fb.height() {
            for &px in self.fb.row(y) {
                out.push(if px == Rgb565::BLACK { '.' } else { '#' });
            }
            out.push('\n');
        }
        out
    }

    fn ssd1351_command(&mut self, command: u8) {
        match command {
            0xA6 => self.inverted = false,
            0xA7 => self.inverted = true,
            0x5C => {
                self.x = self.cols.0;
                self.y = self.rows.0;
            }
            _ => {}
        }
    }

    fn ssd1351_data(&mut self, byte: u8) {
        let Some(command) = self.command else {
            return;
        };
        if command == 0x5C {
            match self.high_byte.take() {
                None => self.high_byte = Some(byte),
                Some(high) => {
                    let raw = u16::from_be_bytes([high, byte]);
                    self.write_pixel(Color(raw).into());
                    self.advance();
                }
            }
            return;
        }

        self.args.push(byte);
        match (command, self.args.as_slice()) {
            (0x15, &[start, end]) => {
                self.cols = (start as u32, end as u32);
                self.x = self.cols.0;
            }
            (0x75, &[start, end]) => {
                self.rows = (start as u32, end as u32);
                self.y = self.rows.0;
            }
            (0xA0, &[remap]) => self.vertical = remap & 0x01 != 0,
            _ => {}
        }
    }

    fn ssd1306_command(&mut self, byte: u8) {
        let Some(command) = self.command else {
            match byte {
                0xA6 => self.inverted = false,
                0xA7 => self.inverted = true,
                _ => {}
            }
            if ssd1306_arg_count(byte) > 0 {
                self.command = Some(byte);
                self.args.clear();
            }
            return;
        };

        self.args.push(byte);
        if self.args.len() < ssd1306_arg_count(command) {
            return;
        }
        match (command, self.args.as_slice()) {
            (0x21, &[start, end]) => {
                self.cols = (start as u32, end as u32);
                self.x = self.cols.0;
            }
            (0x22, &[start, end]) => {
                self.rows = (start as u32, end as u32);
                self.y = self.rows.0;
            }
            _ => {}
        }
        self.command = None;
        self.args.clear();
    }

    fn ssd1306_data(&mut self, byte: u8) {
        for bit in 0..8 {
            let on = byte & (1 << bit) != 0;
            let color = if on { Rgb565::WHITE } else { Rgb565::BLACK };
            self.fb.set_pixel(self.x as usize, (self.y * 8 + bit) as usize, color);
        }
        // horizontal addressing: columns first, then the next page
        self.x += 1;
        if self.x > self.cols.1 {
            self.x = self.cols.0;
            self.y += 1;
            if self.y > self.rows.1 {
                self.y = self.rows.0;
            }
        }
    }

    fn write_pixel(&mut self, color: Rgb565) {
        self.fb.set_pixel(self.x as usize, self.y as usize, color);
    }

    fn advance(&mut self) {
        if self.vertical {
            self.y += 1;
            if self.y > self.rows.1 {
                self.y = self.rows.0;
                self.x += 1;
                if self.x > self.cols.1 {
                    self.x = self.cols.0;
                }
            }
        } else {
            self.x += 1;
            if self.x > self.cols.1 {
                self.x = self.cols.0;
                self.y += 1;
                if self.y > self.rows.1 {
                    self.y = self.rows.0;
                }
            }
        }
    }
}

fn ssd1306_arg_count(command: u8) -> usize {
    match command {
        0x21 | 0x22 => 2,
        0x20 | 0x81 | 0x8D | 0xA8 | 0xD3 | 0xD5 | 0xD9 | 0xDA | 0xDB => 1,
        _ => 0,
    }
}
