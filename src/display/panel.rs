/*
 *  display/panel.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page-oriented panel operations: bring-up, clear, addressing, frame blit
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

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::info;

use crate::display::bus::PanelBus;
use crate::display::drivers::st7565::St7565;
use crate::display::error::DisplayError;

pub const PANEL_WIDTH: usize = 128;
pub const PANEL_HEIGHT: usize = 64;
pub const PAGES: usize = PANEL_HEIGHT / 8;

/// Columns of controller RAM, wider than the visible area
pub const RAM_COLUMNS: usize = 132;

pub const FRAME_SIZE: usize = PANEL_WIDTH * PAGES;

/// Differences between board variants of the bring-up sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelOptions {
    /// Wait after enabling the power circuits, before anything else
    pub settle_delay: Duration,
    /// Wipe controller RAM before turning the display on
    pub clear_before_display_on: bool,
}

/// The panel as a whole: owns the command driver and a delay source.
pub struct Panel<B, D> {
    driver: St7565<B>,
    delay: D,
    options: PanelOptions,
}

impl<B: PanelBus, D: DelayNs> Panel<B, D> {
    pub fn new(bus: B, delay: D, options: PanelOptions) -> Self {
        Self { driver: St7565::new(bus), delay, options }
    }

    /// Power the controller up and turn the display on. The order is fixed:
    /// power must be stable before display-on.
    pub fn initialize(&mut self) -> Result<(), DisplayError> {
        self.driver.set_output_status_select(false)?;
        self.driver.set_power_control(0x07)?;
        if !self.options.settle_delay.is_zero() {
            let ms = u32::try_from(self.options.settle_delay.as_millis()).unwrap_or(u32::MAX);
            self.delay.delay_ms(ms);
        }
        self.driver.set_start_line(0)?;
        self.driver.set_page_addr(0)?;
        self.driver.set_col_addr(0)?;
        if self.options.clear_before_display_on {
            self.clear()?;
        }
        self.driver.display(true)?;
        info!("LCD panel initialized");
        Ok(())
    }

    /// Zero the whole controller RAM, including the columns past 127.
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        for page in 0..PAGES as u8 {
            self.driver.set_page_addr(page)?;
            self.driver.set_col_addr(0)?;
            for _ in 0..RAM_COLUMNS {
                self.driver.write_data(0x00)?;
            }
        }
        Ok(())
    }

    /// Point the write cursor at pixel column `x` of the page holding row `y`.
    pub fn set_address(&mut self, x: u8, y: u8) -> Result<(), DisplayError> {
        self.driver.set_page_addr(y / 8)?;
        self.driver.set_col_addr(x)
    }

    /// Send a whole page-packed frame, one page at a time.
    pub fn flush_frame(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        if frame.len() != FRAME_SIZE {
            return Err(DisplayError::BufferSizeMismatch {
                expected: FRAME_SIZE,
                actual: frame.len(),
            });
        }
        for (page, row) in frame.chunks_exact(PANEL_WIDTH).enumerate() {
            self.set_address(0, (page * 8) as u8)?;
            self.driver.write_multi_data(row)?;
        }
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.driver.set_backlight(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockBus, RecordingDelay};

    fn panel(options: PanelOptions) -> (Panel<MockBus, RecordingDelay>, MockBus, RecordingDelay) {
        let bus = MockBus::new();
        let delay = RecordingDelay::default();
        (Panel::new(bus.clone(), delay.clone(), options), bus, delay)
    }

    #[test]
    fn test_initialize_sequence() {
        let (mut p, bus, delay) = panel(PanelOptions::default());
        p.initialize().unwrap();
        assert_eq!(
            bus.take(),
            vec![
                (false, 0xC8),
                (false, 0x2F),
                (false, 0x40),
                (false, 0xB0),
                (false, 0x00),
                (false, 0x10),
                (false, 0xAF),
            ]
        );
        assert_eq!(delay.total(), Duration::ZERO);
    }

    #[test]
    fn test_initialize_with_settle_and_clear() {
        let options = PanelOptions {
            settle_delay: Duration::from_millis(50),
            clear_before_display_on: true,
        };
        let (mut p, bus, delay) = panel(options);
        p.initialize().unwrap();
        assert_eq!(delay.total(), Duration::from_millis(50));
        assert_eq!(bus.data().len(), PAGES * RAM_COLUMNS);
        assert_eq!(bus.commands().last(), Some(&0xAF));
    }

    #[test]
    fn test_clear_covers_controller_ram() {
        let (mut p, bus, _) = panel(PanelOptions::default());
        p.clear().unwrap();
        let tx = bus.take();
        assert_eq!(tx.len(), PAGES * (3 + RAM_COLUMNS));
        for page in 0..PAGES {
            let chunk = &tx[page * (3 + RAM_COLUMNS)..(page + 1) * (3 + RAM_COLUMNS)];
            assert_eq!(chunk[0], (false, 0xB0 | page as u8));
            assert_eq!(chunk[1], (false, 0x00));
            assert_eq!(chunk[2], (false, 0x10));
            assert!(chunk[3..].iter().all(|&t| t == (true, 0x00)));
        }
    }

    #[test]
    fn test_set_address_translates_pixels() {
        let (mut p, bus, _) = panel(PanelOptions::default());
        p.set_address(100, 43).unwrap();
        assert_eq!(bus.commands(), vec![0xB5, 0x04, 0x16]);
    }

    #[test]
    fn test_flush_frame_streams_every_page() {
        let (mut p, bus, _) = panel(PanelOptions::default());
        let frame: Vec<u8> = (0..FRAME_SIZE).map(|i| (i / PANEL_WIDTH) as u8 + 1).collect();
        p.flush_frame(&frame).unwrap();

        let tx = bus.take();
        assert_eq!(tx.len(), PAGES * (3 + PANEL_WIDTH));
        for page in 0..PAGES {
            let chunk = &tx[page * (3 + PANEL_WIDTH)..(page + 1) * (3 + PANEL_WIDTH)];
            assert_eq!(chunk[0], (false, 0xB0 | page as u8));
            assert!(chunk[3..].iter().all(|&t| t == (true, page as u8 + 1)));
        }
    }

    #[test]
    fn test_flush_frame_rejects_wrong_size() {
        let (mut p, bus, _) = panel(PanelOptions::default());
        let err = p.flush_frame(&[0u8; 512]).unwrap_err();
        assert!(matches!(err, DisplayError::BufferSizeMismatch { expected: 1024, actual: 512 }));
        assert!(bus.take().is_empty());
    }

    #[test]
    fn test_backlight_forwarded() {
        let (mut p, bus, _) = panel(PanelOptions::default());
        p.set_backlight(true).unwrap();
        assert_eq!(bus.state().backlight, Some(true));
    }
}
