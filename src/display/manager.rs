/*
 *  display/manager.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display manager - owns panel, canvas and font for the control loop
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

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::display::bus::PanelBus;
use crate::display::error::DisplayError;
use crate::display::font::GlyphTable;
use crate::display::framebuffer::Canvas;
use crate::display::panel::{Panel, PANEL_HEIGHT, PANEL_WIDTH};

/// Vertical pitch of the four text rows
pub const LINE_PITCH: i32 = 16;

/// The single drawing context: one panel, one canvas, one font.
pub struct DisplayManager<B, D> {
    panel: Panel<B, D>,
    canvas: Canvas,
    font: GlyphTable,
    flush_count: u64,
}

impl<B: PanelBus, D: DelayNs> DisplayManager<B, D> {
    pub fn new(panel: Panel<B, D>, font: GlyphTable) -> Self {
        Self {
            panel,
            canvas: Canvas::new(PANEL_WIDTH as u32, PANEL_HEIGHT as u32),
            font,
            flush_count: 0,
        }
    }

    /// Bring the panel up
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.panel.initialize()
    }

    /// Push the canvas to the panel
    pub fn refresh(&mut self) -> Result<(), DisplayError> {
        self.panel.flush_frame(self.canvas.as_bytes())?;
        self.flush_count += 1;
        Ok(())
    }

    /// Draw `text` at (x, y) and show it immediately
    pub fn text_out(&mut self, x: i32, y: i32, text: &str) -> Result<(), DisplayError> {
        self.canvas.draw_string(x, y, text, BinaryColor::On, &self.font);
        self.refresh()
    }

    /// Blank both canvas and panel
    pub fn graphic_clear(&mut self) -> Result<(), DisplayError> {
        self.canvas.clear(BinaryColor::Off);
        self.refresh()
    }

    /// Replace the screen with up to four text lines in one blit
    pub fn show_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<(), DisplayError> {
        self.canvas.clear(BinaryColor::Off);
        for (row, line) in lines.iter().enumerate() {
            self.canvas
                .draw_string(0, row as i32 * LINE_PITCH, line.as_ref(), BinaryColor::On, &self.font);
        }
        debug!("Showing {} lines", lines.len());
        self.refresh()
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.panel.set_backlight(on)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn font(&self) -> &GlyphTable {
        &self.font
    }

    /// Full-frame blits sent so far
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockBus, RecordingDelay};
    use crate::display::panel::{PanelOptions, FRAME_SIZE};

    fn manager() -> (DisplayManager<MockBus, RecordingDelay>, MockBus) {
        let bus = MockBus::new();
        let panel = Panel::new(bus.clone(), RecordingDelay::default(), PanelOptions::default());
        (DisplayManager::new(panel, GlyphTable::builtin()), bus)
    }

    #[test]
    fn test_graphic_clear_sends_blank_frame() {
        let (mut display, bus) = manager();
        display.canvas_mut().clear(BinaryColor::On);
        display.graphic_clear().unwrap();
        assert_eq!(display.flush_count(), 1);
        let data = bus.data();
        assert_eq!(data.len(), FRAME_SIZE);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_text_out_accumulates() {
        let (mut display, bus) = manager();
        display.text_out(0, 0, "A").unwrap();
        let first = display.canvas().count_on_pixels();
        display.text_out(0, 16, "A").unwrap();
        assert_eq!(display.canvas().count_on_pixels(), first * 2);
        assert_eq!(display.flush_count(), 2);
        assert_eq!(bus.data().len(), 2 * FRAME_SIZE);
    }

    #[test]
    fn test_show_lines_is_one_blit() {
        let (mut display, bus) = manager();
        display.text_out(0, 0, "stale").unwrap();
        bus.take();
        display.show_lines(&["one", "two", "three", "four"]).unwrap();
        assert_eq!(display.flush_count(), 2);
        assert_eq!(bus.data().len(), FRAME_SIZE);

        let mut expected = Canvas::new(128, 64);
        for (row, line) in ["one", "two", "three", "four"].iter().enumerate() {
            expected.draw_string(0, row as i32 * 16, line, BinaryColor::On, display.font());
        }
        assert_eq!(display.canvas(), &expected);
    }

    #[test]
    fn test_failed_flush_is_not_counted() {
        let (mut display, bus) = manager();
        bus.state().simulate_timeout = true;
        assert!(display.refresh().is_err());
        assert_eq!(display.flush_count(), 0);
    }
}
