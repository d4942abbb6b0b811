/*
 *  display/bus.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel transaction layer - command/data select plus SPI master pushes
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
use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::registers::{RegisterWindow, SimRegisterWindow};

/// Byte-at-a-time link to the panel controller.
///
/// Implementations must complete each transaction before returning; there
/// is never more than one byte in flight.
pub trait PanelBus {
    /// Send one byte, as pixel data when `is_data` is set, else as a command
    fn transact(&mut self, is_data: bool, byte: u8) -> Result<(), DisplayError>;

    /// Drive the backlight GPIO
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError>;
}

impl<B: PanelBus + ?Sized> PanelBus for &mut B {
    fn transact(&mut self, is_data: bool, byte: u8) -> Result<(), DisplayError> {
        (**self).transact(is_data, byte)
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        (**self).set_backlight(on)
    }
}

/// Register offsets inside each peripheral block
#[allow(dead_code)]
pub mod regs {
    pub const GPIO_SWPORTA_DR: usize = 0x00;
    pub const GPIO_SWPORTA_DDR: usize = 0x04;

    pub const SPIM_CTRLR0: usize = 0x00;
    pub const SPIM_SSIENR: usize = 0x08;
    pub const SPIM_SER: usize = 0x10;
    pub const SPIM_BAUDR: usize = 0x14;
    pub const SPIM_SR: usize = 0x28;
    pub const SPIM_DR: usize = 0x60;

    pub const RSTMGR_PERMODRST: usize = 0x14;
}

pub mod bits {
    /// GPIO1 lines wired to the LCM
    pub const LCM_BACKLIGHT: u32 = 0x0000_0100;
    pub const LCM_D_C: u32 = 0x0000_1000;
    pub const LCM_RESET_N: u32 = 0x0000_8000;

    /// PERMODRST bit holding SPI master 0 in reset
    pub const SPIM0_RESET: u32 = 0x0004_0000;

    /// SPIM status register
    pub const SR_BUSY: u32 = 0x1;
    pub const SR_TFNF: u32 = 0x4;

    /// CTRLR0 transfer mode field, and the transmit-only value for it
    pub const CTRLR0_TMOD_MASK: u32 = 0x3 << 8;
    pub const CTRLR0_TMOD_TX_ONLY: u32 = 0x1 << 8;
}

/// Where the GPIO, SPI master and reset manager blocks sit in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpsLayout {
    pub gpio1: usize,
    pub spim0: usize,
    pub rstmgr: usize,
}

impl Default for HpsLayout {
    fn default() -> Self {
        // offsets from the 0xFC000000 peripheral window base
        Self {
            gpio1: 0x0370_9000,
            spim0: 0x03F0_0000,
            rstmgr: 0x03D0_5000,
        }
    }
}

impl HpsLayout {
    pub fn gpio_data(&self) -> usize { self.gpio1 + regs::GPIO_SWPORTA_DR }
    pub fn gpio_direction(&self) -> usize { self.gpio1 + regs::GPIO_SWPORTA_DDR }
    pub fn spi_status(&self) -> usize { self.spim0 + regs::SPIM_SR }
    pub fn spi_data(&self) -> usize { self.spim0 + regs::SPIM_DR }

    /// Every register the bus touches must sit inside a window of `span` bytes
    pub fn validate(&self, span: usize) -> Result<(), DisplayError> {
        let highest = [
            ("gpio1", self.gpio1, regs::GPIO_SWPORTA_DDR),
            ("spim0", self.spim0, regs::SPIM_DR),
            ("rstmgr", self.rstmgr, regs::RSTMGR_PERMODRST),
        ];
        for (name, block, last) in highest {
            let fits = block % 4 == 0
                && block
                    .checked_add(last + 4)
                    .is_some_and(|end| end <= span);
            if !fits {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "{} block at {:#x} does not fit a {:#x} byte window",
                    name, block, span
                )));
            }
        }
        Ok(())
    }

    /// A simulated window wired like the real one: the SPI status register
    /// always reports "FIFO not full, idle" and every byte pushed into the
    /// data register is captured along with the D/C level.
    pub fn simulated_window(&self, span: usize) -> SimRegisterWindow {
        let window = SimRegisterWindow::new(span);
        window.pin(self.spi_status(), bits::SR_TFNF);
        window.capture_writes(self.spi_data(), self.gpio_data(), bits::LCM_D_C);
        window
    }
}

/// Timing knobs for the bus
#[derive(Debug, Clone, Copy)]
pub struct BusOptions {
    /// Low and high hold time of the panel reset pulse
    pub reset_pulse: Duration,
    /// Status polls allowed before a wait is declared a hardware fault
    pub spin_limit: u32,
    /// SPI clock divider written to BAUDR
    pub baud_divider: u32,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            reset_pulse: Duration::from_millis(10),
            spin_limit: 100_000,
            baud_divider: 64,
        }
    }
}

/// Panel link built from HPS GPIO1 (D/C, reset, backlight) and SPI master 0.
pub struct HpsSpiBus<W, D> {
    regs: W,
    layout: HpsLayout,
    options: BusOptions,
    delay: D,
    /// Last D/C level driven, `None` until the first transaction
    last_select: Option<bool>,
}

impl<W: RegisterWindow, D: DelayNs> HpsSpiBus<W, D> {
    pub fn new(regs: W, layout: HpsLayout, options: BusOptions, delay: D) -> Self {
        Self { regs, layout, options, delay, last_select: None }
    }

    /// Reset the panel and bring SPI master 0 up in transmit-only mode.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        let gpio_ddr = self.layout.gpio_direction();
        let gpio_dr = self.layout.gpio_data();
        let spim = self.layout.spim0;
        let pulse_ms = u32::try_from(self.options.reset_pulse.as_millis()).unwrap_or(u32::MAX);

        // panel reset pulse
        self.regs.set_bits(gpio_ddr, bits::LCM_RESET_N);
        self.regs.clear_bits(gpio_dr, bits::LCM_RESET_N);
        self.delay.delay_ms(pulse_ms);
        self.regs.set_bits(gpio_dr, bits::LCM_RESET_N);
        self.delay.delay_ms(pulse_ms);

        // backlight off until the first frame is up
        self.regs.set_bits(gpio_ddr, bits::LCM_BACKLIGHT);
        self.regs.clear_bits(gpio_dr, bits::LCM_BACKLIGHT);

        self.regs.set_bits(gpio_ddr, bits::LCM_D_C);
        self.regs.clear_bits(gpio_dr, bits::LCM_D_C);

        self.regs.clear_bits(self.layout.rstmgr + regs::RSTMGR_PERMODRST, bits::SPIM0_RESET);
        self.regs.clear_bits(spim + regs::SPIM_SSIENR, 1);

        let ctrlr0 = self.regs.read(spim + regs::SPIM_CTRLR0);
        self.regs.write(
            spim + regs::SPIM_CTRLR0,
            (ctrlr0 & !bits::CTRLR0_TMOD_MASK) | bits::CTRLR0_TMOD_TX_ONLY,
        );

        self.regs.write(spim + regs::SPIM_BAUDR, self.options.baud_divider);
        self.regs.write(spim + regs::SPIM_SER, 1);
        self.regs.set_bits(spim + regs::SPIM_SSIENR, 1);

        info!("LCD hardware initialized (BAUDR={})", self.options.baud_divider);
        Ok(())
    }

    /// Poll the SPI status register until `mask` reads as `set`.
    fn wait_status(&self, mask: u32, set: bool, waiting_for: &'static str) -> Result<(), DisplayError> {
        let status = self.layout.spi_status();
        for _ in 0..self.options.spin_limit {
            if (self.regs.read(status) & mask != 0) == set {
                return Ok(());
            }
            std::hint::spin_loop();
        }
        Err(DisplayError::HardwareTimeout {
            register: "SPIM0.SR",
            waiting_for,
            spins: self.options.spin_limit,
        })
    }

    fn set_select(&mut self, is_data: bool) {
        let gpio_dr = self.layout.gpio_data();
        if is_data {
            self.regs.set_bits(gpio_dr, bits::LCM_D_C);
        } else {
            self.regs.clear_bits(gpio_dr, bits::LCM_D_C);
        }
        self.last_select = Some(is_data);
    }

}

impl<W: RegisterWindow, D: DelayNs> PanelBus for HpsSpiBus<W, D> {
    fn transact(&mut self, is_data: bool, byte: u8) -> Result<(), DisplayError> {
        // D/C must stay put for a whole burst of one kind
        if self.last_select != Some(is_data) {
            self.set_select(is_data);
        }

        self.wait_status(bits::SR_TFNF, true, "accepting data")?;
        self.regs.write(self.layout.spi_data(), u32::from(byte));
        self.wait_status(bits::SR_TFNF, true, "accepting data")?;
        self.wait_status(bits::SR_BUSY, false, "idle")
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        debug!("Backlight {}", if on { "on" } else { "off" });
        let gpio_dr = self.layout.gpio_data();
        if on {
            self.regs.set_bits(gpio_dr, bits::LCM_BACKLIGHT);
        } else {
            self.regs.clear_bits(gpio_dr, bits::LCM_BACKLIGHT);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::RecordingDelay;

    const SPAN: usize = 0x0400_0000;

    fn bus() -> (HpsSpiBus<SimRegisterWindow, RecordingDelay>, SimRegisterWindow) {
        let layout = HpsLayout::default();
        let window = layout.simulated_window(SPAN);
        let bus = HpsSpiBus::new(window.clone(), layout, BusOptions::default(), RecordingDelay::default());
        (bus, window)
    }

    #[test]
    fn test_first_transaction_always_drives_select() {
        let (mut bus, window) = bus();
        let dr = HpsLayout::default().gpio_data();
        bus.transact(false, 0xAF).unwrap();
        assert_eq!(window.write_count(dr), 1);
        assert_eq!(window.take_transfers(), vec![(false, 0xAF)]);
    }

    #[test]
    fn test_first_transaction_after_init_drives_select() {
        let (mut bus, window) = bus();
        let dr = HpsLayout::default().gpio_data();
        bus.init().unwrap();
        let before = window.write_count(dr);

        bus.transact(false, 0xAF).unwrap();
        assert_eq!(window.write_count(dr) - before, 1);
        bus.transact(false, 0xA4).unwrap();
        assert_eq!(window.write_count(dr) - before, 1);
    }

    #[test]
    fn test_layout_offsets_cannot_overflow() {
        let huge = HpsLayout { gpio1: usize::MAX - 3, ..Default::default() };
        assert!(huge.validate(SPAN).is_err());
        let huge = HpsLayout { spim0: usize::MAX - 0x5F, ..Default::default() };
        assert!(huge.validate(SPAN).is_err());
    }

    #[test]
    fn test_select_toggles_only_on_change() {
        let (mut bus, window) = bus();
        let dr = HpsLayout::default().gpio_data();
        bus.transact(false, 0xB0).unwrap();
        bus.transact(false, 0x00).unwrap();
        bus.transact(true, 0x11).unwrap();
        bus.transact(true, 0x22).unwrap();
        bus.transact(true, 0x33).unwrap();
        bus.transact(false, 0xAF).unwrap();
        // command, data, command: three changes
        assert_eq!(window.write_count(dr), 3);
        assert_eq!(
            window.take_transfers(),
            vec![(false, 0xB0), (false, 0x00), (true, 0x11), (true, 0x22), (true, 0x33), (false, 0xAF)]
        );
    }

    #[test]
    fn test_stuck_fifo_reports_hardware_fault() {
        let layout = HpsLayout::default();
        let window = layout.simulated_window(SPAN);
        window.pin(layout.spi_status(), 0);
        let options = BusOptions { spin_limit: 16, ..Default::default() };
        let mut bus = HpsSpiBus::new(window.clone(), layout, options, RecordingDelay::default());

        let err = bus.transact(true, 0x55).unwrap_err();
        assert!(matches!(err, DisplayError::HardwareTimeout { spins: 16, waiting_for: "accepting data", .. }));
        assert!(window.take_transfers().is_empty());
    }

    #[test]
    fn test_busy_engine_reports_hardware_fault() {
        let layout = HpsLayout::default();
        let window = layout.simulated_window(SPAN);
        window.pin(layout.spi_status(), bits::SR_TFNF | bits::SR_BUSY);
        let options = BusOptions { spin_limit: 4, ..Default::default() };
        let mut bus = HpsSpiBus::new(window.clone(), layout, options, RecordingDelay::default());

        let err = bus.transact(false, 0xAE).unwrap_err();
        assert!(matches!(err, DisplayError::HardwareTimeout { waiting_for: "idle", .. }));
        // the byte itself went out before the engine hung
        assert_eq!(window.take_transfers(), vec![(false, 0xAE)]);
    }

    #[test]
    fn test_init_programs_spi_master() {
        let (mut bus, window) = bus();
        let layout = HpsLayout::default();
        window.poke(layout.spim0 + regs::SPIM_CTRLR0, 0x0000_0307);
        window.poke(layout.rstmgr + regs::RSTMGR_PERMODRST, 0xFFFF_FFFF);

        bus.init().unwrap();

        assert_eq!(window.peek(layout.spim0 + regs::SPIM_CTRLR0), 0x0000_0107);
        assert_eq!(window.peek(layout.spim0 + regs::SPIM_BAUDR), 64);
        assert_eq!(window.peek(layout.spim0 + regs::SPIM_SER), 1);
        assert_eq!(window.peek(layout.spim0 + regs::SPIM_SSIENR), 1);
        assert_eq!(window.peek(layout.rstmgr + regs::RSTMGR_PERMODRST) & bits::SPIM0_RESET, 0);

        let dr = window.peek(layout.gpio_data());
        assert_ne!(dr & bits::LCM_RESET_N, 0, "reset released");
        assert_eq!(dr & bits::LCM_BACKLIGHT, 0, "backlight off");
        assert_eq!(dr & bits::LCM_D_C, 0, "command mode");
        let ddr = window.peek(layout.gpio_direction());
        assert_eq!(ddr & (bits::LCM_RESET_N | bits::LCM_BACKLIGHT | bits::LCM_D_C),
                   bits::LCM_RESET_N | bits::LCM_BACKLIGHT | bits::LCM_D_C);
    }

    #[test]
    fn test_init_holds_reset_for_configured_pulse() {
        let (mut bus, _window) = bus();
        bus.init().unwrap();
        assert_eq!(bus.delay.total(), Duration::from_millis(20));
    }

    #[test]
    fn test_backlight_toggles_gpio() {
        let (mut bus, window) = bus();
        let dr = HpsLayout::default().gpio_data();
        bus.set_backlight(true).unwrap();
        assert_ne!(window.peek(dr) & bits::LCM_BACKLIGHT, 0);
        bus.set_backlight(false).unwrap();
        assert_eq!(window.peek(dr) & bits::LCM_BACKLIGHT, 0);
    }

    #[test]
    fn test_layout_must_fit_window() {
        assert!(HpsLayout::default().validate(SPAN).is_ok());
        assert!(HpsLayout::default().validate(0x1000).is_err());
    }
}
