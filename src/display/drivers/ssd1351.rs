/*
 *  display/drivers/ssd1351.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1351 128x128 RGB565 OLED driver
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

use log::{debug, info};

use crate::display::color::Color;
use crate::display::error::DisplayError;
use crate::display::init_seq::{run_init_sequence, CMD_ARG};
use crate::display::traits::{
    Addressing, BusMode, BusTransport, ChipDriver, ColorDepth, DisplayCapabilities,
};
use crate::display::window::{page_window, row_window, Window};

/// SSD1351 commands
pub mod cmd {
    pub const COLUMN_ADDR: u8 = 0x15;
    pub const ROW_ADDR: u8 = 0x75;
    pub const WRITE_RAM: u8 = 0x5C;
    pub const SEG_REMAP: u8 = 0xA0;
    pub const START_LINE: u8 = 0xA1;
    pub const DISPLAY_OFFSET: u8 = 0xA2;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERT_DISPLAY: u8 = 0xA7;
    pub const FUNCTION_SELECT: u8 = 0xAB;
    pub const SLEEP_ON: u8 = 0xAE;
    pub const SLEEP_OFF: u8 = 0xAF;
    pub const PRECHARGE: u8 = 0xB1;
    pub const CLOCK_DIV: u8 = 0xB3;
    pub const EXT_VSL: u8 = 0xB4;
    pub const GPIO: u8 = 0xB5;
    pub const PRECHARGE_SECOND: u8 = 0xB6;
    pub const PRECHARGE_LEVEL: u8 = 0xBB;
    pub const VCOMH: u8 = 0xBE;
    pub const CONTRAST_ABC: u8 = 0xC1;
    pub const MASTER_CURRENT: u8 = 0xC7;
    pub const MUX_RATIO: u8 = 0xCA;
    pub const COMMAND_LOCK: u8 = 0xFD;

    /// 65k color, COM split, scan reversed; bit 0 picks vertical increment
    pub const REMAP_BASE: u8 = 0b0011_0100;
}

use cmd::*;

static INIT_128X128: &[u8] = &[
    COMMAND_LOCK, CMD_ARG, 0x12,
    COMMAND_LOCK, CMD_ARG, 0xB1,
    SLEEP_ON,
    CLOCK_DIV, CMD_ARG, 0xF1,             // 7:4 oscillator, 3:0 divider
    MUX_RATIO, CMD_ARG, 127,
    SEG_REMAP, CMD_ARG, REMAP_BASE | 1,   // 16-bit color, vertical increment
    START_LINE, CMD_ARG, 0x00,
    DISPLAY_OFFSET, CMD_ARG, 0x00,
    GPIO, CMD_ARG, 0x00,
    FUNCTION_SELECT, CMD_ARG, 0x01,
    PRECHARGE, CMD_ARG, 0x32,
    VCOMH, CMD_ARG, 0x05,
    PRECHARGE_LEVEL, CMD_ARG, 0x17,
    NORMAL_DISPLAY,
    CONTRAST_ABC, CMD_ARG, 0xC8,          // red
                  CMD_ARG, 0x80,          // green
                  CMD_ARG, 0xC8,          // blue
    MASTER_CURRENT, CMD_ARG, 0x0F,
    EXT_VSL, CMD_ARG, 0xA0, CMD_ARG, 0xB5, CMD_ARG, 0x55,
    PRECHARGE_SECOND, CMD_ARG, 0x01,
    SLEEP_OFF,
    NORMAL_DISPLAY,
];

/// SSD1351 display driver
///
/// Starts in page addressing (vertical increment), the orientation the init
/// table programs. Switch to [`Addressing::Rows`] for pixel-row windows.
pub struct Ssd1351Driver<B: BusTransport> {
    bus: B,

    /// Display capabilities
    capabilities: DisplayCapabilities,

    addressing: Addressing,

    /// Last armed block, for next_page
    block_x: u32,
    block_y: u32,
    block_width: u32,
}

impl<B: BusTransport> Ssd1351Driver<B> {
    /// 128x128 module on the given transport
    pub fn new_128x128(bus: B) -> Self {
        Self {
            bus,
            capabilities: DisplayCapabilities {
                width: 128,
                height: 128,
                color_depth: ColorDepth::Rgb565,
            },
            addressing: Addressing::Pages,
            block_x: 0,
            block_y: 0,
            block_width: 0,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    fn command_with_args(&mut self, command: u8, args: &[u8]) -> Result<(), DisplayError> {
        self.bus.set_mode(BusMode::Command)?;
        self.bus.send(command)?;
        // every argument goes out in data mode on this controller
        self.bus.set_mode(BusMode::Data)?;
        self.bus.send_bytes(args)
    }

    /// One bracketed command, used outside of streaming
    fn transaction(&mut self, command: u8, args: &[u8]) -> Result<(), DisplayError> {
        self.bus.start()?;
        let result = self.command_with_args(command, args);
        let stopped = self.bus.stop();
        result.and(stopped)
    }

    fn arm(&mut self, win: Window) -> Result<(), DisplayError> {
        self.bus.start()?;
        self.command_with_args(COLUMN_ADDR, &[win.x_start as u8, win.x_end as u8])?;
        self.command_with_args(ROW_ADDR, &[win.y_start as u8, win.y_end as u8])?;
        self.command_with_args(WRITE_RAM, &[])
    }
}

impl<B: BusTransport> ChipDriver for Ssd1351Driver<B> {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        run_init_sequence(&mut self.bus, INIT_128X128)?;
        self.addressing = Addressing::Pages;
        info!("SSD1351 initialized ({}x{})", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn addressing(&self) -> Addressing {
        self.addressing
    }

    fn set_addressing(&mut self, mode: Addressing) -> Result<(), DisplayError> {
        let vertical = match mode {
            Addressing::Pages => 1,
            Addressing::Rows => 0,
        };
        self.transaction(SEG_REMAP, &[REMAP_BASE | vertical])?;
        self.addressing = mode;
        debug!("SSD1351 addressing switched to {:?}", mode);
        Ok(())
    }

    fn set_block(&mut self, x: u32, y: u32, width: u32) -> Result<Window, DisplayError> {
        let surface = self.dimensions();
        let win = match self.addressing {
            Addressing::Pages => page_window(x, y, width, surface),
            Addressing::Rows => row_window(x, y, width, None, surface),
        };
        self.block_x = x;
        self.block_y = y;
        self.block_width = width;
        self.arm(win)?;
        Ok(win)
    }

    fn next_page(&mut self) -> Result<(), DisplayError> {
        self.end()?;
        let (x, y, width) = (self.block_x, self.block_y + 1, self.block_width);
        self.set_block(x, y, width).map(|_| ())
    }

    fn send_pixel(&mut self, color: Color) -> Result<(), DisplayError> {
        self.bus.send_bytes(&color.to_be_bytes())
    }

    fn send_pixels_packed(&mut self, bits: u8, color: Color) -> Result<(), DisplayError> {
        for bit in 0..8 {
            let px = if bits & (1 << bit) != 0 { color } else { Color::BLACK };
            self.send_pixel(px)?;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), DisplayError> {
        self.bus.stop()
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        // master current is a 4-bit register
        self.transaction(MASTER_CURRENT, &[value >> 4])
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        let command = if inverted { INVERT_DISPLAY } else { NORMAL_DISPLAY };
        self.transaction(command, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{BusEvent, MockBus};

    fn driver() -> (Ssd1351Driver<MockBus>, std::sync::Arc<std::sync::Mutex<crate::display::drivers::mock::MockBusState>>) {
        let bus = MockBus::new();
        let state = bus.state();
        (Ssd1351Driver::new_128x128(bus), state)
    }

    #[test]
    fn test_init_replays_table() {
        let (mut drv, state) = driver();
        drv.init().unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.start_count, 1);
        assert_eq!(guard.stop_count, 1);
        let commands = guard.command_bytes();
        assert_eq!(commands.first(), Some(&COMMAND_LOCK));
        assert_eq!(commands.last(), Some(&NORMAL_DISPLAY));
        // contrast takes three data bytes, ext vsl another three
        assert!(guard.data_bytes().windows(3).any(|w| w == [0xC8, 0x80, 0xC8]));
        assert!(guard.data_bytes().windows(3).any(|w| w == [0xA0, 0xB5, 0x55]));
        assert_eq!(drv.addressing(), Addressing::Pages);
    }

    #[test]
    fn test_page_block_addresses() {
        let (mut drv, state) = driver();
        let win = drv.set_block(10, 1, 20).unwrap();
        drv.end().unwrap();

        assert_eq!((win.x_start, win.x_end, win.y_start, win.y_end), (10, 29, 8, 15));
        let guard = state.lock().unwrap();
        assert_eq!(guard.command_bytes(), vec![COLUMN_ADDR, ROW_ADDR, WRITE_RAM]);
        assert_eq!(guard.data_bytes(), vec![10, 29, 8, 15]);
    }

    #[test]
    fn test_oversized_block_clamps_to_right_edge() {
        let (mut drv, state) = driver();
        let win = drv.set_block(10, 0, u32::MAX).unwrap();
        drv.end().unwrap();
        assert_eq!((win.x_start, win.x_end, win.y_start, win.y_end), (10, 127, 0, 7));
        assert_eq!(state.lock().unwrap().data_bytes(), vec![10, 127, 0, 7]);
    }

    #[test]
    fn test_row_block_runs_to_bottom() {
        let (mut drv, state) = driver();
        drv.set_addressing(Addressing::Rows).unwrap();
        state.lock().unwrap().clear_events();

        let win = drv.set_block(4, 100, 0).unwrap();
        drv.end().unwrap();
        assert_eq!((win.x_start, win.x_end, win.y_start, win.y_end), (4, 127, 100, 127));
        assert_eq!(state.lock().unwrap().data_bytes(), vec![4, 127, 100, 127]);
    }

    #[test]
    fn test_set_addressing_reprograms_remap() {
        let (mut drv, state) = driver();
        drv.set_addressing(Addressing::Rows).unwrap();
        drv.set_addressing(Addressing::Pages).unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.command_bytes(), vec![SEG_REMAP, SEG_REMAP]);
        assert_eq!(guard.data_bytes(), vec![0b0011_0100, 0b0011_0101]);
        assert_eq!(guard.transactions().len(), 2);
    }

    #[test]
    fn test_pixel_goes_out_high_byte_first() {
        let (mut drv, state) = driver();
        drv.set_block(0, 0, 1).unwrap();
        state.lock().unwrap().clear_events();
        drv.send_pixel(Color(0x1234)).unwrap();
        assert_eq!(state.lock().unwrap().events, vec![BusEvent::Byte(0x12), BusEvent::Byte(0x34)]);
    }

    #[test]
    fn test_packed_byte_expands_lsb_first() {
        let (mut drv, state) = driver();
        drv.set_block(0, 0, 1).unwrap();
        state.lock().unwrap().clear_events();
        drv.send_pixels_packed(0b0000_0101, Color::RED).unwrap();

        let data = state.lock().unwrap().bytes();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[0..2], &[0xF8, 0x00]);
        assert_eq!(&data[2..4], &[0x00, 0x00]);
        assert_eq!(&data[4..6], &[0xF8, 0x00]);
        assert!(data[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_next_page_rearms_same_columns() {
        let (mut drv, state) = driver();
        drv.set_block(16, 2, 8).unwrap();
        drv.next_page().unwrap();
        drv.end().unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.transactions().len(), 2);
        assert_eq!(guard.data_bytes(), vec![16, 23, 16, 23, 16, 23, 24, 31]);
        assert_eq!(guard.protocol_violations, 0);
    }

    #[test]
    fn test_brightness_and_invert() {
        let (mut drv, state) = driver();
        drv.set_brightness(0xFF).unwrap();
        drv.set_invert(true).unwrap();
        let guard = state.lock().unwrap();
        assert_eq!(guard.command_bytes(), vec![MASTER_CURRENT, INVERT_DISPLAY]);
        assert_eq!(guard.data_bytes(), vec![0x0F]);
    }
}
