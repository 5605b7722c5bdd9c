/*
 *  display/drivers/mock.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock bus transport for testing without hardware
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::traits::{BusMode, BusTransport};

/// One observable action on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Stop,
    Mode(BusMode),
    Byte(u8),
}

/// Mock bus transport for testing
///
/// Records every start/stop, mode switch and byte so tests can check the
/// exact traffic a drawing call produced. The recorded stream can also be
/// replayed into a [`PanelSimulator`](crate::display::simulator::PanelSimulator)
/// to look at the resulting pixels.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    /// Shared state for testing
    state: Arc<Mutex<MockBusState>>,
}

/// Internal state for the mock bus (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Everything that happened, in order
    pub events: Vec<BusEvent>,

    /// Number of times start() was called
    pub start_count: usize,

    /// Number of times stop() was called
    pub stop_count: usize,

    /// Total bytes accepted by send()
    pub bytes_sent: usize,

    /// Whether a transaction is open
    pub in_transaction: bool,

    /// start inside a transaction, stop or send outside one
    pub protocol_violations: usize,

    /// Simulate failures: sends fail once this many bytes went through
    pub fail_after: Option<usize>,
}

impl MockBusState {
    /// Bytes sent while the bus was in `mode`
    pub fn bytes_in_mode(&self, mode: BusMode) -> Vec<u8> {
        let mut current = BusMode::Command;
        let mut out = Vec::new();
        for event in &self.events {
            match *event {
                BusEvent::Mode(m) => current = m,
                BusEvent::Byte(b) if current == mode => out.push(b),
                _ => {}
            }
        }
        out
    }

    /// Every byte regardless of mode
    pub fn bytes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn command_bytes(&self) -> Vec<u8> {
        self.bytes_in_mode(BusMode::Command)
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.bytes_in_mode(BusMode::Data)
    }

    /// Events of each start..stop bracket, brackets excluded
    pub fn transactions(&self) -> Vec<Vec<BusEvent>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<BusEvent>> = None;
        for &event in &self.events {
            match event {
                BusEvent::Start => current = Some(Vec::new()),
                BusEvent::Stop => {
                    if let Some(done) = current.take() {
                        out.push(done);
                    }
                }
                other => {
                    if let Some(open) = current.as_mut() {
                        open.push(other);
                    }
                }
            }
        }
        out
    }

    /// Forget recorded traffic, keep failure settings
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.start_count = 0;
        self.stop_count = 0;
        self.bytes_sent = 0;
        self.protocol_violations = 0;
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockBusState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BusTransport for MockBus {
    fn start(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if state.in_transaction {
            state.protocol_violations += 1;
        }
        state.in_transaction = true;
        state.start_count += 1;
        state.events.push(BusEvent::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if !state.in_transaction {
            state.protocol_violations += 1;
        }
        state.in_transaction = false;
        state.stop_count += 1;
        state.events.push(BusEvent::Stop);
        Ok(())
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if let Some(limit) = state.fail_after {
            if state.bytes_sent >= limit {
                return Err(DisplayError::Bus("Simulated bus failure".to_string()));
            }
        }
        if !state.in_transaction {
            state.protocol_violations += 1;
        }
        state.bytes_sent += 1;
        state.events.push(BusEvent::Byte(byte));
        Ok(())
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), DisplayError> {
        self.lock().events.push(BusEvent::Mode(mode));
        Ok(())
    }
}
