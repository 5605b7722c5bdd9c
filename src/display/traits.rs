/*
 *  display/traits.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for bus transport and chip driver abstraction
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

use crate::display::color::Color;
use crate::display::error::DisplayError;
use crate::display::window::Window;

/// Color depth capabilities of different display drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// Monochrome displays (1-bit per pixel)
    /// Used by: SSD1306
    Monochrome,

    /// 16-bit RGB565, two bytes per pixel, high byte first
    /// Used by: SSD1351
    Rgb565,
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Color depth (monochrome or RGB565)
    pub color_depth: ColorDepth,
}

/// Byte mode on the bus: the DC line on SPI, the control byte on I2C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    Command,
    Data,
}

/// Serial transport the chip drivers talk through
///
/// `start` must precede any `send` and every `start` is paired with exactly
/// one `stop`. Implementations may batch internally but everything sent must
/// be on the wire once `stop` returns.
pub trait BusTransport: Send {
    /// Begin a transaction (assert chip select)
    fn start(&mut self) -> Result<(), DisplayError>;

    /// End the transaction, flushing anything still batched
    fn stop(&mut self) -> Result<(), DisplayError>;

    /// Transmit one byte in the current mode
    fn send(&mut self, byte: u8) -> Result<(), DisplayError>;

    /// Switch between command and data bytes
    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError>;

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        for &b in bytes {
            self.send(b)?;
        }
        Ok(())
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn start(&mut self) -> Result<(), DisplayError> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        (**self).stop()
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        (**self).send(byte)
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        (**self).set_mode(mode)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        (**self).send_bytes(bytes)
    }
}

/// How the controller's write pointer walks an armed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Vertical increment inside 8-row pages; `set_block` takes a page index
    /// and every streamed unit is a packed column of 8 pixels
    Pages,

    /// Horizontal increment, one pixel row after another; `set_block` takes
    /// a pixel row
    Rows,
}

/// Capability set every supported controller implements
///
/// The canvas never talks to the transport directly: it arms a window with
/// `set_block`, streams pixels, and closes the transaction with `end`.
pub trait ChipDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Replay the controller init table and arm the default orientation
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Addressing variant `set_block` currently uses
    fn addressing(&self) -> Addressing;

    /// Reprogram the scan direction; only some controllers can
    fn set_addressing(&mut self, mode: Addressing) -> Result<(), DisplayError> {
        if mode == self.addressing() {
            return Ok(());
        }
        Err(DisplayError::UnsupportedOperation)
    }

    /// Begin a transaction and arm a window at column `x`, row or page `y`,
    /// `width` columns wide (0 runs to the right edge)
    fn set_block(&mut self, x: u32, y: u32, width: u32) -> Result<Window, DisplayError>;

    /// Move the armed window one page (or row) down at the same columns
    fn next_page(&mut self) -> Result<(), DisplayError>;

    /// Stream one pixel into the armed window
    fn send_pixel(&mut self, color: Color) -> Result<(), DisplayError>;

    fn send_pixel_buffer(&mut self, pixels: &[Color]) -> Result<(), DisplayError> {
        for &p in pixels {
            self.send_pixel(p)?;
        }
        Ok(())
    }

    /// Stream eight vertically stacked pixels from one packed byte, LSB on top
    fn send_pixels_packed(&mut self, bits: u8, color: Color) -> Result<(), DisplayError>;

    /// Close the transaction opened by `set_block`
    fn end(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Set display inversion (if supported)
    fn set_invert(&mut self, _inverted: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }
}
