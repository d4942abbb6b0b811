/*
 *  pacer.rs
 *
 *  lcdmsg - ST7565 message panel
 *	(c) 2020-25 Stuart Hunter
 *
 *	Fixed-cadence pacing for the poll loop
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::time::{Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    period: Duration,
}

// a full-frame blit at BAUDR 64 costs a few ms; 50ms polls leave
// plenty of room, so an overrun only ever means a slow redraw
impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self { next_deadline: Instant::now() + period, period }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left until the next deadline as seen at `now`
    #[inline]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }

    /// Schedule the deadline after `now`; an overrun restarts the cadence
    /// from `now` instead of bursting to catch up.
    pub fn advance(&mut self, now: Instant) -> Duration {
        let wait = self.remaining(now);
        self.next_deadline = if wait.is_zero() {
            now + self.period
        } else {
            self.next_deadline + self.period
        };
        wait
    }

    /// Sleep until the current deadline, then schedule the next one.
    pub fn wait(&mut self) {
        let wait = self.advance(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}
