/*
 *  display/drivers/mock.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock panel bus and delay for testing without hardware
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
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::display::bus::PanelBus;
use crate::display::error::DisplayError;

/// Mock panel bus
///
/// Records every transaction instead of driving hardware. Useful for:
/// - Unit tests
/// - Integration tests
/// - Development without hardware
///
/// Clones share state, so keep one for inspection before handing the other
/// to the driver.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockBusState>>,
}

/// Internal state for the mock bus (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Every (is_data, byte) pair in order
    pub transactions: Vec<(bool, u8)>,

    /// Last backlight level set
    pub backlight: Option<bool>,

    /// Fail the next transaction with a hardware timeout
    pub simulate_timeout: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> MutexGuard<'_, MockBusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drain the recorded transactions
    pub fn take(&self) -> Vec<(bool, u8)> {
        std::mem::take(&mut self.state().transactions)
    }

    /// Command bytes only, in order
    pub fn commands(&self) -> Vec<u8> {
        self.state()
            .transactions
            .iter()
            .filter(|(is_data, _)| !is_data)
            .map(|&(_, b)| b)
            .collect()
    }

    /// Data bytes only, in order
    pub fn data(&self) -> Vec<u8> {
        self.state()
            .transactions
            .iter()
            .filter(|(is_data, _)| *is_data)
            .map(|&(_, b)| b)
            .collect()
    }
}

impl PanelBus for MockBus {
    fn transact(&mut self, is_data: bool, byte: u8) -> Result<(), DisplayError> {
        let mut state = self.state();
        if state.simulate_timeout {
            state.simulate_timeout = false;
            return Err(DisplayError::HardwareTimeout {
                register: "mock",
                waiting_for: "idle",
                spins: 0,
            });
        }
        state.transactions.push((is_data, byte));
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.state().backlight = Some(on);
        Ok(())
    }
}

/// Delay that returns immediately and remembers how long it was asked to wait
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    total_ns: Arc<Mutex<u64>>,
}

impl RecordingDelay {
    pub fn total(&self) -> Duration {
        Duration::from_nanos(*self.total_ns.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.lock().unwrap_or_else(|e| e.into_inner()) += u64::from(ns);
    }
}
