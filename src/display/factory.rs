/*
 *  display/factory.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds a chip driver on a real or recorded bus from configuration
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

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, I2cdev, SpidevDevice};
use log::{debug, info};

use crate::config::{AddressingMode, BusConfig, DisplayConfig, DriverKind};
use crate::display::bus::{hardware_reset, I2cTransport, SpiTransport};
use crate::display::drivers::mock::MockBus;
use crate::display::error::{DisplayError, DisplayFactoryError};
use crate::display::traits::{Addressing, BusMode, BusTransport, ChipDriver};

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

#[cfg(feature = "driver-ssd1351")]
use crate::display::drivers::ssd1351::Ssd1351Driver;

/// Type alias for boxed chip driver trait objects
pub type BoxedDriver = Box<dyn ChipDriver>;

/// Type alias for boxed transports, what the factory hands to a driver
pub type BoxedBus = Box<dyn BusTransport>;

const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
const CONSUMER: &str = "oledstream";

impl From<AddressingMode> for Addressing {
    fn from(mode: AddressingMode) -> Self {
        match mode {
            AddressingMode::Pages => Addressing::Pages,
            AddressingMode::Rows => Addressing::Rows,
        }
    }
}

/// Keeps the reset line requested for as long as the transport lives
struct ResetHeld<B> {
    bus: B,
    _rst: CdevPin,
}

impl<B: BusTransport> BusTransport for ResetHeld<B> {
    fn start(&mut self) -> Result<(), DisplayError> {
        self.bus.start()
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        self.bus.stop()
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.bus.send(byte)
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        self.bus.set_mode(mode)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.bus.send_bytes(bytes)
    }
}

/// Factory for creating chip drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Open the configured bus and wrap it in the configured driver
    ///
    /// The returned driver is not initialized yet; run `init` (directly or
    /// through the canvas) before drawing.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedDriver, DisplayFactoryError> {
        Self::validate_config(config)?;
        let driver_kind = config.driver.ok_or(DisplayFactoryError::NoDriverSpecified)?;
        let bus_config = config.bus.as_ref().ok_or(DisplayFactoryError::NoBusConfiguration)?;

        check_size(driver_kind, config)?;
        let bus = Self::open_bus(bus_config, driver_kind.max_bus_hz())?;
        Self::build_driver(driver_kind, config, bus)
    }

    /// Driver on a recording bus; the returned handle shares the recording
    pub fn create_emulated(config: &DisplayConfig) -> Result<(BoxedDriver, MockBus), DisplayFactoryError> {
        let driver_kind = config.driver.ok_or(DisplayFactoryError::NoDriverSpecified)?;
        let mock = MockBus::new();
        info!("Emulation mode enabled - recording {:?} traffic", driver_kind);
        let driver = Self::build_driver(driver_kind, config, Box::new(mock.clone()))?;
        Ok((driver, mock))
    }

    fn build_driver(
        driver_kind: DriverKind,
        config: &DisplayConfig,
        bus: BoxedBus,
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        let (width, height) = check_size(driver_kind, config)?;
        match driver_kind {
            #[cfg(feature = "driver-ssd1306")]
            DriverKind::Ssd1306 => {
                info!("Creating SSD1306 driver ({}x{})", width, height);
                match (width, height) {
                    (128, 64) => Ok(Box::new(Ssd1306Driver::new_128x64(bus))),
                    (128, 32) => Ok(Box::new(Ssd1306Driver::new_128x32(bus))),
                    _ => Err(DisplayFactoryError::ConfigError(format!(
                        "SSD1306 does not support {}x{}", width, height
                    ))),
                }
            }

            #[cfg(feature = "driver-ssd1351")]
            DriverKind::Ssd1351 => {
                info!("Creating SSD1351 driver ({}x{})", width, height);
                match (width, height) {
                    (128, 128) => Ok(Box::new(Ssd1351Driver::new_128x128(bus))),
                    _ => Err(DisplayFactoryError::ConfigError(format!(
                        "SSD1351 does not support {}x{}", width, height
                    ))),
                }
            }

            #[allow(unreachable_patterns)]
            _ => {
                #[cfg(not(feature = "driver-ssd1306"))]
                if matches!(driver_kind, DriverKind::Ssd1306) {
                    return Err(DisplayFactoryError::ConfigError(
                        "SSD1306 driver not enabled. Enable with --features driver-ssd1306".to_string()
                    ));
                }

                #[cfg(not(feature = "driver-ssd1351"))]
                if matches!(driver_kind, DriverKind::Ssd1351) {
                    return Err(DisplayFactoryError::ConfigError(
                        "SSD1351 driver not enabled. Enable with --features driver-ssd1351".to_string()
                    ));
                }

                Err(DisplayFactoryError::UnsupportedCombination)
            }
        }
    }

    fn open_bus(bus_config: &BusConfig, max_hz: u32) -> Result<BoxedBus, DisplayFactoryError> {
        match bus_config {
            BusConfig::I2c { bus, address, .. } => {
                info!("Opening I2C bus {} at address 0x{:02X}", bus, address);
                let i2c = I2cdev::new(bus).map_err(|e| {
                    DisplayError::Bus(format!("Failed to open I2C bus {}: {}", bus, e))
                })?;
                Ok(Box::new(I2cTransport::new(i2c, *address)))
            }

            BusConfig::Spi { bus, speed_hz, dc_pin, rst_pin, gpio_chip } => {
                let speed = speed_hz.map_or(max_hz, |hz| hz.min(max_hz));
                info!("Opening SPI bus {} at {} Hz", bus, speed);
                let mut spi = SpidevDevice::open(bus).map_err(|e| {
                    DisplayError::Bus(format!("Failed to open SPI device {}: {}", bus, e))
                })?;
                let options = SpidevOptions::new()
                    .bits_per_word(8)
                    .max_speed_hz(speed)
                    .mode(SpiModeFlags::SPI_MODE_0)
                    .build();
                spi.configure(&options).map_err(|e| {
                    DisplayError::Bus(format!("Failed to configure SPI device {}: {}", bus, e))
                })?;

                let chip_path = gpio_chip.as_deref().unwrap_or(DEFAULT_GPIO_CHIP);
                let mut chip = Chip::new(chip_path).map_err(|e| {
                    DisplayError::GpioError(format!("Failed to open {}: {}", chip_path, e))
                })?;
                let dc = request_output(&mut chip, *dc_pin, 0)?;
                let transport = SpiTransport::new(spi, dc);

                match rst_pin {
                    Some(line) => {
                        let mut rst = request_output(&mut chip, *line, 1)?;
                        debug!("Pulsing reset on line {}", line);
                        hardware_reset(&mut rst, &mut Delay)?;
                        Ok(Box::new(ResetHeld { bus: transport, _rst: rst }))
                    }
                    None => Ok(Box::new(transport)),
                }
            }
        }
    }

    /// Push addressing, brightness and inversion from the config to an
    /// initialized driver
    pub fn apply_settings(driver: &mut dyn ChipDriver, config: &DisplayConfig) -> Result<(), DisplayError> {
        if let Some(mode) = config.addressing {
            driver.set_addressing(mode.into())?;
        }
        if let Some(level) = config.brightness {
            driver.set_brightness(level)?;
        }
        if let Some(invert) = config.invert {
            driver.set_invert(invert)?;
        }
        Ok(())
    }

    /// Validate a configuration without creating a driver
    ///
    /// This is useful for checking configuration at startup before attempting
    /// to open any device.
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayFactoryError> {
        let driver_kind = config.driver.ok_or(DisplayFactoryError::NoDriverSpecified)?;
        let bus_config = config.bus.as_ref().ok_or(DisplayFactoryError::NoBusConfiguration)?;

        if let Some(rotation) = config.rotate_deg {
            if rotation != 0 && rotation != 90 && rotation != 180 && rotation != 270 {
                return Err(DisplayFactoryError::ConfigError(
                    format!("Invalid rotation angle: {} (must be 0, 90, 180, or 270)", rotation)
                ));
            }
        }

        match (driver_kind, bus_config) {
            (DriverKind::Ssd1351, BusConfig::I2c { .. }) => Err(DisplayFactoryError::UnsupportedCombination),
            _ => Ok(()),
        }
    }
}

/// Configured panel size, rejected before any device is opened when the
/// driver has no init table for it
fn check_size(driver_kind: DriverKind, config: &DisplayConfig) -> Result<(u32, u32), DisplayFactoryError> {
    let size = config.size().unwrap_or_else(|| driver_kind.default_size());
    if !driver_kind.supported_sizes().contains(&size) {
        return Err(DisplayFactoryError::ConfigError(format!(
            "{:?} does not support {}x{}", driver_kind, size.0, size.1
        )));
    }
    Ok(size)
}

fn request_output(chip: &mut Chip, offset: u32, initial: u8) -> Result<CdevPin, DisplayError> {
    let line = chip.get_line(offset).map_err(|e| {
        DisplayError::GpioError(format!("Failed to get line {}: {}", offset, e))
    })?;
    let handle = line.request(LineRequestFlags::OUTPUT, initial, CONSUMER).map_err(|e| {
        DisplayError::GpioError(format!("Failed to request line {}: {}", offset, e))
    })?;
    CdevPin::new(handle).map_err(|e| DisplayError::GpioError(format!("Line {}: {:?}", offset, e)))
}
