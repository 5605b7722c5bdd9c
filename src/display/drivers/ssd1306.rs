/*
 *  display/drivers/ssd1306.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 OLED display driver implementation
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

use log::info;

use crate::display::color::Color;
use crate::display::error::DisplayError;
use crate::display::init_seq::run_init_sequence;
use crate::display::traits::{
    Addressing, BusMode, BusTransport, ChipDriver, ColorDepth, DisplayCapabilities,
};
use crate::display::window::{page_window, Window, PAGE_HEIGHT};

/// SSD1306 commands
pub mod cmd {
    pub const MEMORY_MODE: u8 = 0x20;
    pub const COLUMN_ADDR: u8 = 0x21;
    pub const PAGE_ADDR: u8 = 0x22;
    pub const START_LINE: u8 = 0x40;
    pub const CONTRAST: u8 = 0x81;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const SEG_REMAP: u8 = 0xA1;
    pub const DISPLAY_RAM: u8 = 0xA4;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERT_DISPLAY: u8 = 0xA7;
    pub const MUX_RATIO: u8 = 0xA8;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const DISPLAY_OFFSET: u8 = 0xD3;
    pub const CLOCK_DIV: u8 = 0xD5;
    pub const PRECHARGE: u8 = 0xD9;
    pub const COM_PINS: u8 = 0xDA;
    pub const VCOM_DESELECT: u8 = 0xDB;
}

use cmd::*;

// Arguments follow their command in command mode on this controller
static INIT_128X64: &[u8] = &[
    DISPLAY_OFF,
    CLOCK_DIV, 0x80,
    MUX_RATIO, 63,
    DISPLAY_OFFSET, 0x00,
    START_LINE,
    CHARGE_PUMP, 0x14,
    MEMORY_MODE, 0x00,       // horizontal
    SEG_REMAP,
    COM_SCAN_DEC,
    COM_PINS, 0x12,
    CONTRAST, 0xCF,
    PRECHARGE, 0xF1,
    VCOM_DESELECT, 0x40,
    DISPLAY_RAM,
    NORMAL_DISPLAY,
    DISPLAY_ON,
];

static INIT_128X32: &[u8] = &[
    DISPLAY_OFF,
    CLOCK_DIV, 0x80,
    MUX_RATIO, 31,
    DISPLAY_OFFSET, 0x00,
    START_LINE,
    CHARGE_PUMP, 0x14,
    MEMORY_MODE, 0x00,
    SEG_REMAP,
    COM_SCAN_DEC,
    COM_PINS, 0x02,
    CONTRAST, 0x8F,
    PRECHARGE, 0xF1,
    VCOM_DESELECT, 0x40,
    DISPLAY_RAM,
    NORMAL_DISPLAY,
    DISPLAY_ON,
];

/// SSD1306 display driver
///
/// Monochrome, page addressed only. A block spans from the requested page
/// down to the last page, so the controller walks into the next page on its
/// own once a page row of columns has been streamed and `next_page` has
/// nothing to send.
pub struct Ssd1306Driver<B: BusTransport> {
    bus: B,

    /// Display capabilities
    capabilities: DisplayCapabilities,

    init_table: &'static [u8],
}

impl<B: BusTransport> Ssd1306Driver<B> {
    pub fn new_128x64(bus: B) -> Self {
        Self::with_geometry(bus, 128, 64, INIT_128X64)
    }

    pub fn new_128x32(bus: B) -> Self {
        Self::with_geometry(bus, 128, 32, INIT_128X32)
    }

    fn with_geometry(bus: B, width: u32, height: u32, init_table: &'static [u8]) -> Self {
        Self {
            bus,
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: ColorDepth::Monochrome,
            },
            init_table,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    fn transaction(&mut self, commands: &[u8]) -> Result<(), DisplayError> {
        self.bus.start()?;
        let result = self
            .bus
            .set_mode(BusMode::Command)
            .and_then(|_| self.bus.send_bytes(commands));
        let stopped = self.bus.stop();
        result.and(stopped)
    }
}

impl<B: BusTransport> ChipDriver for Ssd1306Driver<B> {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        run_init_sequence(&mut self.bus, self.init_table)?;
        info!("SSD1306 initialized ({}x{})", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn addressing(&self) -> Addressing {
        Addressing::Pages
    }

    fn set_block(&mut self, x: u32, page: u32, width: u32) -> Result<Window, DisplayError> {
        let surface = self.dimensions();
        let first = page_window(x, page, width, surface);
        let last_page = (surface.1 - 1) / PAGE_HEIGHT;
        let win = Window { y_end: surface.1 - 1, ..first };

        self.bus.start()?;
        self.bus.set_mode(BusMode::Command)?;
        self.bus.send_bytes(&[
            COLUMN_ADDR,
            win.x_start as u8,
            win.x_end as u8,
            PAGE_ADDR,
            win.page_start() as u8,
            last_page as u8,
        ])?;
        self.bus.set_mode(BusMode::Data)?;
        Ok(win)
    }

    fn next_page(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn send_pixel(&mut self, color: Color) -> Result<(), DisplayError> {
        // one unit is a whole 8-pixel column of the current page
        self.bus.send(if color.is_on() { 0xFF } else { 0x00 })
    }

    fn send_pixels_packed(&mut self, bits: u8, color: Color) -> Result<(), DisplayError> {
        self.bus.send(if color.is_on() { bits } else { 0x00 })
    }

    fn end(&mut self) -> Result<(), DisplayError> {
        self.bus.stop()
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.transaction(&[CONTRAST, value])
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.transaction(&[if inverted { INVERT_DISPLAY } else { NORMAL_DISPLAY }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockBus;

    #[test]
    fn test_init_sends_arguments_as_commands() {
        let bus = MockBus::new();
        let state = bus.state();
        let mut drv = Ssd1306Driver::new_128x64(bus);
        drv.init().unwrap();

        let guard = state.lock().unwrap();
        assert!(guard.data_bytes().is_empty());
        assert_eq!(guard.command_bytes(), INIT_128X64.to_vec());
        assert_eq!(guard.transactions().len(), 1);
    }

    #[test]
    fn test_short_panel_geometry() {
        let bus = MockBus::new();
        let state = bus.state();
        let mut drv = Ssd1306Driver::new_128x32(bus);
        assert_eq!(drv.dimensions(), (128, 32));
        drv.init().unwrap();
        assert!(state.lock().unwrap().command_bytes().windows(2).any(|w| w == [MUX_RATIO, 31]));
    }

    #[test]
    fn test_block_spans_to_last_page() {
        let bus = MockBus::new();
        let state = bus.state();
        let mut drv = Ssd1306Driver::new_128x64(bus);

        let win = drv.set_block(10, 2, 4).unwrap();
        drv.send_pixels_packed(0b1010_0101, Color::WHITE).unwrap();
        drv.send_pixels_packed(0b1010_0101, Color::BLACK).unwrap();
        drv.end().unwrap();

        assert_eq!((win.x_start, win.x_end, win.y_start, win.y_end), (10, 13, 16, 63));
        let guard = state.lock().unwrap();
        assert_eq!(guard.command_bytes(), vec![COLUMN_ADDR, 10, 13, PAGE_ADDR, 2, 7]);
        assert_eq!(guard.data_bytes(), vec![0b1010_0101, 0x00]);
        assert_eq!(guard.protocol_violations, 0);
    }

    #[test]
    fn test_contrast_and_invert() {
        let bus = MockBus::new();
        let state = bus.state();
        let mut drv = Ssd1306Driver::new_128x64(bus);
        drv.set_brightness(0x40).unwrap();
        drv.set_invert(true).unwrap();
        drv.set_invert(false).unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.command_bytes(), vec![CONTRAST, 0x40, INVERT_DISPLAY, NORMAL_DISPLAY]);
        assert_eq!(guard.transactions().len(), 3);
    }

    #[test]
    fn test_rows_addressing_unsupported() {
        let mut drv = Ssd1306Driver::new_128x64(MockBus::new());
        assert!(drv.set_addressing(Addressing::Pages).is_ok());
        assert!(matches!(
            drv.set_addressing(Addressing::Rows),
            Err(DisplayError::UnsupportedOperation)
        ));
    }
}
