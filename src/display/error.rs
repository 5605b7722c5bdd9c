/*
 *  display/error.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for display subsystem
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

use std::fmt;
use std::error::Error;

/// Unified error type for all display operations
///
/// Geometry never produces an error: out-of-surface drawing is clipped.
/// What remains are transport failures, configuration mistakes and
/// operations a given addressing mode cannot express.
#[derive(Debug)]
pub enum DisplayError {
    /// Bus transfer (SPI or I2C) failed
    Bus(String),

    /// GPIO pin error (DC or reset line)
    GpioError(String),

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Unsupported operation for this display or addressing mode
    UnsupportedOperation,

    /// Invalid rotation angle
    InvalidRotation(u16),

    /// Initialization table ends with a dangling argument marker
    MalformedInitTable { offset: usize },

    /// Source buffer shorter than the geometry it is drawn with
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Display interface error
    InterfaceError(display_interface::DisplayError),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Bus(msg) =>
                write!(f, "Bus transfer error: {}", msg),
            DisplayError::GpioError(msg) =>
                write!(f, "GPIO error: {}", msg),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
            DisplayError::InvalidRotation(degrees) =>
                write!(f, "Invalid rotation angle: {} (must be 0, 90, 180, or 270)", degrees),
            DisplayError::MalformedInitTable { offset } =>
                write!(f, "Init table has a dangling argument marker at offset {}", offset),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {}, got {}", expected, actual),
            DisplayError::InterfaceError(err) =>
                write!(f, "Display interface error: {:?}", err),
        }
    }
}

impl Error for DisplayError {
    // display_interface::DisplayError doesn't implement std::error::Error
    // so we can't provide it as a source
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::InterfaceError(err)
    }
}

/// Factory error types
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// No driver specified in configuration
    NoDriverSpecified,

    /// No bus configuration specified
    NoBusConfiguration,

    /// Unsupported driver/bus combination
    UnsupportedCombination,

    /// Display driver initialization failed
    DriverInitFailed(DisplayError),

    /// Configuration validation error
    ConfigError(String),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayFactoryError::NoDriverSpecified =>
                write!(f, "No display driver specified in configuration"),
            DisplayFactoryError::NoBusConfiguration =>
                write!(f, "No bus configuration specified"),
            DisplayFactoryError::UnsupportedCombination =>
                write!(f, "Unsupported driver/bus combination"),
            DisplayFactoryError::DriverInitFailed(err) =>
                write!(f, "Driver initialization failed: {}", err),
            DisplayFactoryError::ConfigError(msg) =>
                write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayFactoryError::DriverInitFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        DisplayFactoryError::DriverInitFailed(err)
    }
}

impl From<DisplayFactoryError> for DisplayError {
    fn from(err: DisplayFactoryError) -> Self {
        match err {
            DisplayFactoryError::DriverInitFailed(e) => e,
            DisplayFactoryError::NoDriverSpecified =>
                DisplayError::InvalidConfiguration("No driver specified".to_string()),
            DisplayFactoryError::NoBusConfiguration =>
                DisplayError::InvalidConfiguration("No bus configuration".to_string()),
            DisplayFactoryError::UnsupportedCombination =>
                DisplayError::InvalidConfiguration("Unsupported driver/bus combination".to_string()),
            DisplayFactoryError::ConfigError(msg) =>
                DisplayError::InvalidConfiguration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_table_message() {
        let err = DisplayError::MalformedInitTable { offset: 41 };
        assert_eq!(err.to_string(), "Init table has a dangling argument marker at offset 41");
    }

    #[test]
    fn test_factory_error_roundtrip() {
        let err: DisplayError = DisplayFactoryError::NoBusConfiguration.into();
        assert!(matches!(err, DisplayError::InvalidConfiguration(_)));

        let wrapped: DisplayFactoryError = DisplayError::UnsupportedOperation.into();
        assert!(wrapped.source().is_some());
    }

    #[test]
    fn test_interface_error_conversion() {
        let err: DisplayError = display_interface::DisplayError::BusWriteError.into();
        assert!(matches!(err, DisplayError::InterfaceError(_)));
    }
}
