/*
 *  display/mod.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - register window up to the drawing context
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

// Hardware access, bottom up
pub mod registers;
pub mod error;
pub mod bus;
pub mod drivers;
pub mod panel;

// Drawing
pub mod framebuffer;
pub mod font;
pub mod manager;

// Display mode controller
pub mod mode_controller;

// Re-exports for convenience
pub use registers::{MmapRegisterWindow, RegisterError, RegisterWindow, SimRegisterWindow};
pub use error::DisplayError;
pub use bus::{BusOptions, HpsLayout, HpsSpiBus, PanelBus};
pub use drivers::st7565::St7565;
pub use panel::{Panel, PanelOptions};
pub use framebuffer::Canvas;
pub use font::GlyphTable;
pub use manager::DisplayManager;
pub use mode_controller::{ModeController, ModeControllerConfig, Screen, ScreenMode, SimultaneousPolicy};
