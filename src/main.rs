/*
 *  main.rs
 *
 *  lcdmsg - ST7565 message panel
 *	(c) 2020-26 Stuart Hunter
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

use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::Env;
use linux_embedded_hal::Delay;
use log::{error, info, warn};

use lcdmsg::app::App;
use lcdmsg::buttons::RegisterButtons;
use lcdmsg::config::{self, Config};
use lcdmsg::display::{
    DisplayManager, GlyphTable, HpsSpiBus, MmapRegisterWindow, Panel, RegisterWindow,
};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Bus, panel, display context and loop over whichever window we got
fn run<W: RegisterWindow + Clone>(cfg: &Config, regs: W) -> Result<()> {
    let mut bus = HpsSpiBus::new(regs.clone(), cfg.layout(), cfg.bus_options(), Delay);
    bus.init().context("SPI master bring-up failed")?;
    info!("SPI master ready ({:?})", cfg.bus_options());

    let panel = Panel::new(bus, Delay, cfg.panel_options());
    let font = GlyphTable::builtin();
    info!("Glyph table: {} glyphs, advance {}", font.len(), font.font_width());
    let display = DisplayManager::new(panel, font);

    let buttons = RegisterButtons::new(regs, cfg.button_offset());
    let messages = cfg.message_table();
    info!("Message table: {} entries", messages.len());

    let mut app = App::new(
        display,
        buttons,
        cfg.button_mask(),
        messages,
        cfg.mode_config(),
        cfg.poll_interval(),
    );
    app.start().context("LCD initialization failed")?;
    app.run(cfg.max_iterations).context("control loop stopped")?;
    Ok(())
}

fn main() -> Result<()> {
    let cfg = config::load().context("cannot load configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} - ST7565 message panel", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let result = if cfg.simulate() {
        warn!("Simulation mode - no hardware access");
        let window = cfg.layout().simulated_window(cfg.window_span());
        // active low: nothing pressed
        window.poke(cfg.button_offset(), u32::MAX);
        run(&cfg, window)
    } else {
        let device = cfg.device();
        match MmapRegisterWindow::open(&device, cfg.window_base(), cfg.window_span()) {
            Ok(window) => {
                info!(
                    "Mapped {:#x} bytes of {} at {:#x}",
                    window.span(),
                    device.display(),
                    window.phys_base()
                );
                run(&cfg, Arc::new(window))
            }
            Err(e) => Err(anyhow::Error::new(e).context("cannot map HPS peripheral window")),
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
