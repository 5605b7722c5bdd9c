/*
 *  display/mod.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - transports, chip drivers and the streaming canvas
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod color;
pub mod window;

// Transports and chip drivers
pub mod bus;
pub mod init_seq;
pub mod drivers;
pub mod factory;

// Drawing
pub mod font;
pub mod text;
pub mod canvas;

// Replays recorded traffic into pixels
pub mod simulator;

// Re-exports for convenience
pub use traits::{Addressing, BusMode, BusTransport, ChipDriver, ColorDepth, DisplayCapabilities};
pub use error::{DisplayError, DisplayFactoryError};
pub use color::Color;
pub use window::Window;
pub use factory::{BoxedBus, BoxedDriver, DisplayDriverFactory};
pub use font::{FixedFont, GlyphSource, FONT_6X8};
pub use text::{Cursor, Rotation};
pub use canvas::Canvas;
pub use simulator::{PanelKind, PanelSimulator};

// Re-export driver types when features are enabled
#[cfg(feature = "driver-ssd1306")]
pub use drivers::ssd1306::Ssd1306Driver;

#[cfg(feature = "driver-ssd1351")]
pub use drivers::ssd1351::Ssd1351Driver;
