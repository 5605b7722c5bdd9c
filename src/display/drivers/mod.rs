/*
 *  display/drivers/mod.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Controller driver implementations
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

// Conditionally compile each driver based on feature flags
#[cfg(feature = "driver-ssd1306")]
pub mod ssd1306;

#[cfg(feature = "driver-ssd1351")]
pub mod ssd1351;

// Recording transport, backs emulated displays and the tests
pub mod mock;
