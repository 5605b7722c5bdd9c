/*
 *  display/init_seq.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Controller init table interpreter
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

use log::debug;

use crate::display::error::DisplayError;
use crate::display::traits::{BusMode, BusTransport};

/// Marks the following table byte as an argument sent in data mode
pub const CMD_ARG: u8 = 0xFF;

/// Replay an init table inside a single start/stop bracket
///
/// Plain bytes go out as commands. `CMD_ARG, n` sends `n` in data mode and
/// drops back to command mode.
pub fn run_init_sequence<B>(bus: &mut B, table: &[u8]) -> Result<(), DisplayError>
where
    B: BusTransport + ?Sized,
{
    debug!("Replaying {} byte init table", table.len());
    bus.start()?;
    let result = replay(bus, table);
    let stopped = bus.stop();
    result.and(stopped)
}

fn replay<B>(bus: &mut B, table: &[u8]) -> Result<(), DisplayError>
where
    B: BusTransport + ?Sized,
{
    bus.set_mode(BusMode::Command)?;
    let mut bytes = table.iter().copied().enumerate();
    while let Some((offset, byte)) = bytes.next() {
        if byte != CMD_ARG {
            bus.send(byte)?;
            continue;
        }
        let Some((_, arg)) = bytes.next() else {
            debug_assert!(false, "dangling CMD_ARG at offset {offset}");
            return Err(DisplayError::MalformedInitTable { offset });
        };
        bus.set_mode(BusMode::Data)?;
        bus.send(arg)?;
        bus.set_mode(BusMode::Command)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{BusEvent, MockBus};

    #[test]
    fn test_arguments_go_out_in_data_mode() {
        let mut bus = MockBus::new();
        let state = bus.state();
        run_init_sequence(&mut bus, &[0xAE, CMD_ARG, 0x12, 0xAF]).unwrap();

        let events = state.lock().unwrap().events.clone();
        assert_eq!(events, vec![
            BusEvent::Start,
            BusEvent::Mode(BusMode::Command),
            BusEvent::Byte(0xAE),
            BusEvent::Mode(BusMode::Data),
            BusEvent::Byte(0x12),
            BusEvent::Mode(BusMode::Command),
            BusEvent::Byte(0xAF),
            BusEvent::Stop,
        ]);
    }

    #[test]
    fn test_argument_may_equal_marker() {
        let mut bus = MockBus::new();
        let state = bus.state();
        run_init_sequence(&mut bus, &[0xC1, CMD_ARG, CMD_ARG]).unwrap();

        let guard = state.lock().unwrap();
        assert_eq!(guard.data_bytes(), vec![0xFF]);
        assert_eq!(guard.command_bytes(), vec![0xC1]);
    }

    #[test]
    fn test_empty_table_still_brackets() {
        let mut bus = MockBus::new();
        let state = bus.state();
        run_init_sequence(&mut bus, &[]).unwrap();
        let guard = state.lock().unwrap();
        assert_eq!(guard.start_count, 1);
        assert_eq!(guard.stop_count, 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "dangling CMD_ARG"))]
    fn test_dangling_marker_rejected() {
        let mut bus = MockBus::new();
        let state = bus.state();
        let result = run_init_sequence(&mut bus, &[0xAE, CMD_ARG]);
        assert!(matches!(result, Err(DisplayError::MalformedInitTable { offset: 1 })));
        assert_eq!(state.lock().unwrap().stop_count, 1);
    }

    #[test]
    fn test_bus_failure_still_stops() {
        let mut bus = MockBus::new();
        let state = bus.state();
        state.lock().unwrap().fail_after = Some(1);
        assert!(run_init_sequence(&mut bus, &[0x01, 0x02, 0x03]).is_err());
        assert_eq!(state.lock().unwrap().stop_count, 1);
    }
}
