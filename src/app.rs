/*
 *  app.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Control loop - poll buttons, advance the mode controller, draw
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

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::buttons::{ButtonEdges, ButtonSource};
use crate::display::bus::PanelBus;
use crate::display::error::DisplayError;
use crate::display::manager::DisplayManager;
use crate::display::mode_controller::{ModeController, ModeControllerConfig, Screen};
use crate::messages::{MessageTable, HOME_SCREEN, IDLE_SCREEN};
use crate::pacer::Pacer;

/// Everything the loop owns. Built once at startup, then driven by `run`.
pub struct App<B, D, S> {
    display: DisplayManager<B, D>,
    buttons: S,
    edges: ButtonEdges,
    controller: ModeController,
    messages: MessageTable,
    pacer: Pacer,
}

impl<B: PanelBus, D: DelayNs, S: ButtonSource> App<B, D, S> {
    pub fn new(
        display: DisplayManager<B, D>,
        buttons: S,
        button_mask: u32,
        messages: MessageTable,
        mut controller_config: ModeControllerConfig,
        poll_interval: Duration,
    ) -> Self {
        controller_config.message_count = messages.len();
        Self {
            display,
            buttons,
            edges: ButtonEdges::new(button_mask),
            controller: ModeController::new(controller_config, Instant::now()),
            messages,
            pacer: Pacer::new(poll_interval),
        }
    }

    /// Panel bring-up: initialize, blank, backlight on
    pub fn start(&mut self) -> Result<(), DisplayError> {
        self.display.init()?;
        self.display.graphic_clear()?;
        self.display.set_backlight(true)?;
        info!("LCD Ready.");
        Ok(())
    }

    /// One loop iteration at time `now`, without sleeping
    pub fn step(&mut self, now: Instant) -> Result<(), DisplayError> {
        let press = self.edges.update(self.buttons.read_raw());
        if let Some(keys) = press {
            info!(
                "Button pressed: {} (KEY0={} KEY1={} KEY2={} KEY3={})",
                keys,
                keys & 1,
                (keys >> 1) & 1,
                (keys >> 2) & 1,
                (keys >> 3) & 1
            );
        }

        if let Some(screen) = self.controller.tick(now, press) {
            self.render(screen)?;
        }
        Ok(())
    }

    fn render(&mut self, screen: Screen) -> Result<(), DisplayError> {
        match screen {
            Screen::Idle => self.display.show_lines(&IDLE_SCREEN),
            Screen::Home => self.display.show_lines(&HOME_SCREEN),
            Screen::Message(index) => match self.messages.get(index) {
                Some(lines) => {
                    debug!("Showing message {}", index);
                    self.display.show_lines(lines)
                }
                None => Err(DisplayError::InvalidConfiguration(format!(
                    "message {} outside table of {}",
                    index,
                    self.messages.len()
                ))),
            },
        }
    }

    /// Poll at the configured cadence. Runs forever with `None`, otherwise
    /// stops after that many iterations.
    pub fn run(&mut self, max_iterations: Option<u64>) -> Result<(), DisplayError> {
        info!("=== LCD MESSAGE SYSTEM STARTED ({:?} poll) ===", self.pacer.period());
        let mut iterations = 0u64;
        while max_iterations.is_none_or(|max| iterations < max) {
            self.step(Instant::now())?;
            iterations += 1;
            self.pacer.wait();
        }
        info!("Stopped after {} iterations", iterations);
        Ok(())
    }

    pub fn display(&self) -> &DisplayManager<B, D> {
        &self.display
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn buttons_mut(&mut self) -> &mut S {
        &mut self.buttons
    }
}
