/*
 *  buttons.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Push-button input: raw register polling and press-edge detection
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

use crate::display::registers::RegisterWindow;

pub const KEY_BACK: u32 = 0x1; // KEY0
pub const KEY_NEXT: u32 = 0x2; // KEY1
pub const KEY_PREV: u32 = 0x4; // KEY2
pub const KEY_AUX: u32 = 0x8;  // KEY3

pub const DEFAULT_BUTTON_MASK: u32 = 0x0F;

/// Anything that can report the raw button register.
pub trait ButtonSource {
    /// Raw value; buttons are active low
    fn read_raw(&mut self) -> u32;
}

/// Buttons read from the PIO data register inside the register window
pub struct RegisterButtons<W> {
    regs: W,
    offset: usize,
}

impl<W: RegisterWindow> RegisterButtons<W> {
    pub fn new(regs: W, offset: usize) -> Self {
        Self { regs, offset }
    }
}

impl<W: RegisterWindow> ButtonSource for RegisterButtons<W> {
    fn read_raw(&mut self) -> u32 {
        self.regs.read(self.offset)
    }
}

/// Turns polled raw values into press-edges: all released -> any pressed.
#[derive(Debug, Clone)]
pub struct ButtonEdges {
    mask: u32,
    last: u32,
}

impl ButtonEdges {
    pub fn new(mask: u32) -> Self {
        Self { mask, last: 0 }
    }

    /// Feed one raw sample; returns the active-high pressed mask on a
    /// press-edge. Keys joining an already held key do not count.
    pub fn update(&mut self, raw: u32) -> Option<u32> {
        let pressed = !raw & self.mask;
        let edge = pressed != 0 && self.last == 0;
        self.last = pressed;
        edge.then_some(pressed)
    }

    /// Active-high mask from the last sample
    pub fn held(&self) -> u32 {
        self.last
    }
}

impl Default for ButtonEdges {
    fn default() -> Self {
        Self::new(DEFAULT_BUTTON_MASK)
    }
}
