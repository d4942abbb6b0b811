/*
 *  display/drivers/st7565.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7565/NT7534 command encoding
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

use crate::display::bus::PanelBus;
use crate::display::error::DisplayError;

/// Controller opcodes
pub mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_PAGE: u8 = 0xB0;
    pub const SET_COL_LOW: u8 = 0x00;
    pub const SET_COL_HIGH: u8 = 0x10;
    pub const OUTPUT_NORMAL: u8 = 0xC0;
    pub const OUTPUT_REVERSE: u8 = 0xC8;
    pub const POWER_CONTROL: u8 = 0x28;
}

/// Highest column the controller RAM addresses
pub const MAX_COLUMN: u8 = 131;

/// Arguments are masked, never rejected; what goes on the wire must match
/// what the controller would latch from the raw value.
#[inline]
fn masked(what: &str, value: u8, mask: u8, limit: u8) -> u8 {
    if cfg!(any(debug_assertions, feature = "trace-masking")) && value > limit {
        debug!("{} {} out of range (max {}), sending {}", what, value, limit, value & mask);
    }
    value & mask
}

/// Command-level driver for the ST7565 family.
pub struct St7565<B> {
    bus: B,
}

impl<B: PanelBus> St7565<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    fn write_cmd(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.bus.transact(false, cmd)
    }

    pub fn display(&mut self, on: bool) -> Result<(), DisplayError> {
        self.write_cmd(if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF })
    }

    /// RAM line shown at the top of the panel (0-63)
    pub fn set_start_line(&mut self, line: u8) -> Result<(), DisplayError> {
        self.write_cmd(cmd::SET_START_LINE | masked("start line", line, 0x3F, 63))
    }

    /// Page (band of 8 rows) for the next data writes (0-15, 8 used)
    pub fn set_page_addr(&mut self, page: u8) -> Result<(), DisplayError> {
        self.write_cmd(cmd::SET_PAGE | masked("page", page, 0x0F, 15))
    }

    /// Column for the next data writes, sent as low then high nibble
    pub fn set_col_addr(&mut self, col: u8) -> Result<(), DisplayError> {
        if cfg!(any(debug_assertions, feature = "trace-masking")) && col > MAX_COLUMN {
            debug!("column {} beyond controller RAM (max {})", col, MAX_COLUMN);
        }
        self.write_cmd(cmd::SET_COL_LOW | (col & 0x0F))?;
        self.write_cmd(cmd::SET_COL_HIGH | ((col >> 4) & 0x0F))
    }

    /// COM output scan direction; `false` selects reverse
    pub fn set_output_status_select(&mut self, normal: bool) -> Result<(), DisplayError> {
        self.write_cmd(if normal { cmd::OUTPUT_NORMAL } else { cmd::OUTPUT_REVERSE })
    }

    /// Booster, regulator and follower enables (3-bit mask)
    pub fn set_power_control(&mut self, mask: u8) -> Result<(), DisplayError> {
        self.write_cmd(cmd::POWER_CONTROL | masked("power mask", mask, 0x07, 7))
    }

    pub fn write_data(&mut self, data: u8) -> Result<(), DisplayError> {
        self.bus.transact(true, data)
    }

    pub fn write_multi_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        data.iter().try_for_each(|&b| self.write_data(b))
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.bus.set_backlight(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockBus;

    fn driver() -> (St7565<MockBus>, MockBus) {
        let bus = MockBus::new();
        (St7565::new(bus.clone()), bus)
    }

    #[test]
    fn test_column_address_split() {
        let (mut lcd, bus) = driver();
        lcd.set_col_addr(0x97).unwrap();
        assert_eq!(bus.take(), vec![(false, 0x07), (false, 0x19)]);
    }

    #[test]
    fn test_column_zero() {
        let (mut lcd, bus) = driver();
        lcd.set_col_addr(0).unwrap();
        assert_eq!(bus.commands(), vec![0x00, 0x10]);
    }

    #[test]
    fn test_display_on_off() {
        let (mut lcd, bus) = driver();
        lcd.display(true).unwrap();
        lcd.display(false).unwrap();
        assert_eq!(bus.commands(), vec![0xAF, 0xAE]);
    }

    #[test]
    fn test_arguments_wrap_through_mask() {
        let (mut lcd, bus) = driver();
        lcd.set_start_line(64).unwrap();
        lcd.set_start_line(63).unwrap();
        lcd.set_page_addr(0x13).unwrap();
        lcd.set_power_control(0x0F).unwrap();
        assert_eq!(bus.commands(), vec![0x40, 0x7F, 0xB3, 0x2F]);
    }

    #[test]
    fn test_output_select() {
        let (mut lcd, bus) = driver();
        lcd.set_output_status_select(false).unwrap();
        lcd.set_output_status_select(true).unwrap();
        assert_eq!(bus.commands(), vec![0xC8, 0xC0]);
    }

    #[test]
    fn test_data_passes_through() {
        let (mut lcd, bus) = driver();
        lcd.write_multi_data(&[0x00, 0xFF, 0x5A]).unwrap();
        assert_eq!(bus.take(), vec![(true, 0x00), (true, 0xFF), (true, 0x5A)]);
    }

    #[test]
    fn test_bus_error_stops_burst() {
        let (mut lcd, bus) = driver();
        lcd.write_data(1).unwrap();
        bus.state().simulate_timeout = true;
        assert!(lcd.write_multi_data(&[2, 3, 4]).is_err());
        assert_eq!(bus.data(), vec![1]);
    }
}
