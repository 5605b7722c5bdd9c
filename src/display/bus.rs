/*
 *  display/bus.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  SPI, I2C and display-interface transports plus the reset pulse
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

use display_interface::{DataFormat, WriteOnlyDataCommand};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;
use log::trace;

use crate::display::error::DisplayError;
use crate::display::traits::{BusMode, BusTransport};

/// Largest batch held before it is pushed to the device
pub const SPI_BATCH_BYTES: usize = 4096;

/// Linux i2c-dev rejects very long messages on some adapters
pub const I2C_BATCH_BYTES: usize = 1024;

/// I2C control byte: following bytes are commands
pub const I2C_CONTROL_COMMAND: u8 = 0x00;

/// I2C control byte: following bytes are display RAM data
pub const I2C_CONTROL_DATA: u8 = 0x40;

/// Pulse the controller reset line: high, 1 ms, low for 20 ms, high
pub fn hardware_reset<RST, D>(rst: &mut RST, delay: &mut D) -> Result<(), DisplayError>
where
    RST: OutputPin,
    D: DelayNs,
{
    let gpio = |e: RST::Error| DisplayError::GpioError(format!("reset line: {:?}", e));
    rst.set_high().map_err(gpio)?;
    delay.delay_ms(1);
    rst.set_low().map_err(gpio)?;
    delay.delay_ms(20);
    rst.set_high().map_err(gpio)
}

/// Four wire SPI: the DC line picks command or data bytes
///
/// Bytes are collected per mode and written as one SPI transfer when the mode
/// changes, the transaction stops, or the batch fills up.
pub struct SpiTransport<SPI, DC> {
    spi: SPI,
    dc: DC,
    mode: BusMode,
    batch: Vec<u8>,
}

impl<SPI, DC> SpiTransport<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self {
            spi,
            dc,
            mode: BusMode::Command,
            batch: Vec::with_capacity(SPI_BATCH_BYTES),
        }
    }

    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        trace!("SPI flush {} bytes ({:?})", self.batch.len(), self.mode);
        let result = self
            .spi
            .write(&self.batch)
            .map_err(|e| DisplayError::Bus(format!("SPI write failed: {:?}", e)));
        self.batch.clear();
        result
    }

    fn drive_dc(&mut self) -> Result<(), DisplayError> {
        let result = match self.mode {
            BusMode::Command => self.dc.set_low(),
            BusMode::Data => self.dc.set_high(),
        };
        result.map_err(|e| DisplayError::GpioError(format!("DC line: {:?}", e)))
    }
}

impl<SPI, DC> BusTransport for SpiTransport<SPI, DC>
where
    SPI: SpiDevice + Send,
    DC: OutputPin + Send,
{
    fn start(&mut self) -> Result<(), DisplayError> {
        self.batch.clear();
        self.drive_dc()
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        self.flush()
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.batch.push(byte);
        if self.batch.len() >= SPI_BATCH_BYTES {
            self.flush()?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        if mode == self.mode {
            return Ok(());
        }
        self.flush()?;
        self.mode = mode;
        self.drive_dc()
    }
}

/// I2C with a control byte in front of every write
pub struct I2cTransport<I2C> {
    i2c: I2C,
    address: u8,
    mode: BusMode,
    batch: Vec<u8>,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            mode: BusMode::Command,
            batch: Vec::with_capacity(I2C_BATCH_BYTES + 1),
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn control_byte(&self) -> u8 {
        match self.mode {
            BusMode::Command => I2C_CONTROL_COMMAND,
            BusMode::Data => I2C_CONTROL_DATA,
        }
    }

    fn reset_batch(&mut self) {
        self.batch.clear();
        let control = self.control_byte();
        self.batch.push(control);
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.batch.len() <= 1 {
            return Ok(());
        }
        trace!("I2C flush {} bytes to 0x{:02X}", self.batch.len() - 1, self.address);
        let result = self
            .i2c
            .write(self.address, &self.batch)
            .map_err(|e| DisplayError::Bus(format!("I2C write to 0x{:02X} failed: {:?}", self.address, e)));
        self.reset_batch();
        result
    }
}

impl<I2C: I2c + Send> BusTransport for I2cTransport<I2C> {
    fn start(&mut self) -> Result<(), DisplayError> {
        self.reset_batch();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        self.flush()
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        if self.batch.is_empty() {
            self.reset_batch();
        }
        self.batch.push(byte);
        if self.batch.len() > I2C_BATCH_BYTES {
            self.flush()?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        if mode == self.mode {
            return Ok(());
        }
        self.flush()?;
        self.mode = mode;
        self.reset_batch();
        Ok(())
    }
}

/// Adapter for anything speaking `display-interface`
pub struct InterfaceTransport<DI> {
    di: DI,
    mode: BusMode,
    batch: Vec<u8>,
}

impl<DI: WriteOnlyDataCommand> InterfaceTransport<DI> {
    pub fn new(di: DI) -> Self {
        Self {
            di,
            mode: BusMode::Command,
            batch: Vec::new(),
        }
    }

    pub fn release(self) -> DI {
        self.di
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let result = match self.mode {
            BusMode::Command => self.di.send_commands(DataFormat::U8(&self.batch)),
            BusMode::Data => self.di.send_data(DataFormat::U8(&self.batch)),
        };
        self.batch.clear();
        result.map_err(DisplayError::from)
    }
}

impl<DI: WriteOnlyDataCommand + Send> BusTransport for InterfaceTransport<DI> {
    fn start(&mut self) -> Result<(), DisplayError> {
        self.batch.clear();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        self.flush()
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.batch.push(byte);
        if self.batch.len() >= SPI_BATCH_BYTES {
            self.flush()?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        if mode != self.mode {
            self.flush()?;
            self.mode = mode;
        }
        Ok(())
    }
}
