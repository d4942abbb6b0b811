/*
 *  display/mode_controller.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen mode controller - decides which screen to show from button
 *  presses and inactivity
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

use serde::{Deserialize, Serialize};

use crate::buttons::{KEY_BACK, KEY_NEXT, KEY_PREV};

/// Screen mode enum - controls what content is shown on the display
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ScreenMode {
    Init,     // Startup only, forces the first clear
    Idle,     // Splash / press any key
    Home,     // Welcome menu
    Message,  // One entry of the message table
}

/// What to do when next and previous arrive in the same press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimultaneousPolicy {
    /// Apply next then previous (net: no movement)
    #[default]
    Both,
    /// Apply next only
    Next,
    /// Apply neither
    Ignore,
}

/// A screen the caller has to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Idle,
    Home,
    Message(usize),
}

/// Configuration for the mode controller
#[derive(Debug, Clone)]
pub struct ModeControllerConfig {
    /// Inactivity before falling back to Idle
    pub idle_timeout: Duration,

    /// Number of entries in the message table
    pub message_count: usize,

    pub simultaneous: SimultaneousPolicy,
}

impl Default for ModeControllerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(15),
            message_count: 18,
            simultaneous: SimultaneousPolicy::Both,
        }
    }
}

/// Mode controller - one instance, driven once per poll from the loop
pub struct ModeController {
    config: ModeControllerConfig,
    current: ScreenMode,
    previous: ScreenMode,
    msg_index: usize,
    last_msg_index: Option<usize>,
    last_activity: Instant,
}

impl ModeController {
    pub fn new(mut config: ModeControllerConfig, now: Instant) -> Self {
        config.message_count = config.message_count.max(1);
        Self {
            config,
            current: ScreenMode::Init,
            previous: ScreenMode::Init,
            msg_index: 0,
            last_msg_index: None,
            last_activity: now,
        }
    }

    pub fn current_mode(&self) -> ScreenMode {
        self.current
    }

    pub fn message_index(&self) -> usize {
        self.msg_index
    }

    pub fn time_since_activity(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Advance one poll. `press` is the button mask of a new press-edge, if
    /// one happened this tick. Returns the screen to draw, if any: screens
    /// are drawn on entry and, for messages, when the index moves. The
    /// transition decided here is drawn on the following tick.
    pub fn tick(&mut self, now: Instant, press: Option<u32>) -> Option<Screen> {
        if press.is_some() {
            self.last_activity = now;
        }
        let timed_out = self.time_since_activity(now) > self.config.idle_timeout;
        let keys = press.unwrap_or(0);

        if self.current == ScreenMode::Init {
            self.current = ScreenMode::Idle;
        }

        let entering = self.current != self.previous;
        let redraw = match self.current {
            ScreenMode::Idle if entering => Some(Screen::Idle),
            ScreenMode::Home if entering => Some(Screen::Home),
            ScreenMode::Message if entering || self.last_msg_index != Some(self.msg_index) => {
                self.last_msg_index = Some(self.msg_index);
                Some(Screen::Message(self.msg_index))
            }
            _ => None,
        };
        if redraw.is_some() {
            log::info!(">>> Entering {:?}, drawing screen", self.current);
        }
        self.previous = self.current;

        match self.current {
            ScreenMode::Init => {}
            ScreenMode::Idle => {
                if press.is_some() {
                    self.transition(ScreenMode::Home);
                }
            }
            ScreenMode::Home => {
                if keys & KEY_BACK != 0 {
                    self.transition(ScreenMode::Idle);
                }
                if keys & (KEY_NEXT | KEY_PREV) != 0 {
                    self.transition(ScreenMode::Message);
                    self.msg_index = 0;
                    self.last_msg_index = None;
                }
                if timed_out {
                    log::info!("Timeout: {:?} -> Idle", self.current);
                    self.current = ScreenMode::Idle;
                }
            }
            ScreenMode::Message => {
                if keys & KEY_BACK != 0 {
                    self.transition(ScreenMode::Home);
                }
                let both = keys & KEY_NEXT != 0 && keys & KEY_PREV != 0;
                let (next, prev) = match (both, self.config.simultaneous) {
                    (true, SimultaneousPolicy::Next) => (true, false),
                    (true, SimultaneousPolicy::Ignore) => (false, false),
                    _ => (keys & KEY_NEXT != 0, keys & KEY_PREV != 0),
                };
                if next {
                    self.msg_index = (self.msg_index + 1) % self.config.message_count;
                    log::info!("Next message: {}", self.msg_index);
                }
                if prev {
                    self.msg_index = self
                        .msg_index
                        .checked_sub(1)
                        .unwrap_or(self.config.message_count - 1);
                    log::info!("Previous message: {}", self.msg_index);
                }
                if timed_out {
                    log::info!("Timeout: {:?} -> Idle", self.current);
                    self.current = ScreenMode::Idle;
                }
            }
        }

        redraw
    }

    fn transition(&mut self, next: ScreenMode) {
        log::info!("Transition: {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}
