/*
 *  config.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration with command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::buttons::DEFAULT_BUTTON_MASK;
use crate::display::bus::{BusOptions, HpsLayout};
use crate::display::mode_controller::{ModeControllerConfig, SimultaneousPolicy};
use crate::display::panel::PanelOptions;
use crate::messages::{Message, MessageTable};

pub const DEFAULT_DEVICE: &str = "/dev/mem";
pub const DEFAULT_WINDOW_BASE: u64 = 0xFC00_0000;
pub const DEFAULT_WINDOW_SPAN: usize = 0x0400_0000;
/// PIO button port (0xFF200000 + 0x5000) folded into the window
pub const DEFAULT_BUTTON_OFFSET: usize = 0x0320_5000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 15;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional; getters below
/// fill in the reference board values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub max_iterations: Option<u64>,   // absent runs forever
    pub registers: Option<RegisterConfig>,
    pub panel: Option<PanelConfig>,
    pub ui: Option<UiConfig>,
    pub messages: Option<Vec<Message>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegisterConfig {
    pub device: Option<PathBuf>,
    pub base: Option<u64>,
    pub span: Option<usize>,
    pub gpio1_offset: Option<usize>,
    pub spim0_offset: Option<usize>,
    pub rstmgr_offset: Option<usize>,
    pub button_offset: Option<usize>,
    pub simulate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    pub settle_delay_ms: Option<u64>,
    pub reset_pulse_ms: Option<u64>,
    pub clear_before_display_on: Option<bool>,
    pub spin_limit: Option<u32>,
    pub baud_divider: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiConfig {
    pub poll_interval_ms: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub button_mask: Option<u32>,
    pub simultaneous_next_prev: Option<SimultaneousPolicy>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lcdmsg", version, about = "ST7565 LCD message browser")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Shorthand for --log-level debug
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Run against an in-memory register window instead of /dev/mem
    #[arg(long, action = ArgAction::SetTrue)]
    pub simulate: bool,
    /// Stop after this many loop iterations
    #[arg(long)]
    pub iterations: Option<u64>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,
    #[arg(long)]
    pub settle_delay_ms: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Everything `load` does short of parsing argv and dumping.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lcdmsg/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lcdmsg/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lcdmsg.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lcdmsg.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.max_iterations.is_some() { dst.max_iterations = src.max_iterations; }
    if src.messages.is_some()       { dst.messages = src.messages; }

    match (&mut dst.registers, src.registers) {
        (None, Some(c)) => dst.registers = Some(c),
        (Some(d), Some(s)) => merge_registers(d, s),
        _ => {}
    }
    match (&mut dst.panel, src.panel) {
        (None, Some(c)) => dst.panel = Some(c),
        (Some(d), Some(s)) => merge_panel(d, s),
        _ => {}
    }
    match (&mut dst.ui, src.ui) {
        (None, Some(c)) => dst.ui = Some(c),
        (Some(d), Some(s)) => merge_ui(d, s),
        _ => {}
    }
}

fn merge_registers(dst: &mut RegisterConfig, src: RegisterConfig) {
    if src.device.is_some()        { dst.device = src.device; }
    if src.base.is_some()          { dst.base = src.base; }
    if src.span.is_some()          { dst.span = src.span; }
    if src.gpio1_offset.is_some()  { dst.gpio1_offset = src.gpio1_offset; }
    if src.spim0_offset.is_some()  { dst.spim0_offset = src.spim0_offset; }
    if src.rstmgr_offset.is_some() { dst.rstmgr_offset = src.rstmgr_offset; }
    if src.button_offset.is_some() { dst.button_offset = src.button_offset; }
    if src.simulate.is_some()      { dst.simulate = src.simulate; }
}

fn merge_panel(dst: &mut PanelConfig, src: PanelConfig) {
    if src.settle_delay_ms.is_some()         { dst.settle_delay_ms = src.settle_delay_ms; }
    if src.reset_pulse_ms.is_some()          { dst.reset_pulse_ms = src.reset_pulse_ms; }
    if src.clear_before_display_on.is_some() { dst.clear_before_display_on = src.clear_before_display_on; }
    if src.spin_limit.is_some()              { dst.spin_limit = src.spin_limit; }
    if src.baud_divider.is_some()            { dst.baud_divider = src.baud_divider; }
}

fn merge_ui(dst: &mut UiConfig, src: UiConfig) {
    if src.poll_interval_ms.is_some()       { dst.poll_interval_ms = src.poll_interval_ms; }
    if src.idle_timeout_secs.is_some()      { dst.idle_timeout_secs = src.idle_timeout_secs; }
    if src.button_mask.is_some()            { dst.button_mask = src.button_mask; }
    if src.simultaneous_next_prev.is_some() { dst.simultaneous_next_prev = src.simultaneous_next_prev; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()  { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                { cfg.log_level = Some("debug".into()); }
    if cli.iterations.is_some() { cfg.max_iterations = cli.iterations; }

    if cli.simulate {
        cfg.registers.get_or_insert_with(RegisterConfig::default).simulate = Some(true);
    }
    if cli.settle_delay_ms.is_some() {
        cfg.panel.get_or_insert_with(PanelConfig::default).settle_delay_ms = cli.settle_delay_ms;
    }
    if cli.poll_interval_ms.is_some() || cli.idle_timeout_secs.is_some() {
        let ui = cfg.ui.get_or_insert_with(UiConfig::default);
        if cli.poll_interval_ms.is_some()  { ui.poll_interval_ms = cli.poll_interval_ms; }
        if cli.idle_timeout_secs.is_some() { ui.idle_timeout_secs = cli.idle_timeout_secs; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let span = cfg.window_span();
    if span == 0 {
        return Err(ConfigError::Validation("registers span must be > 0".into()));
    }
    cfg.layout()
        .validate(span)
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    let button = cfg.button_offset();
    if button % 4 != 0 || !button.checked_add(4).is_some_and(|end| end <= span) {
        return Err(ConfigError::Validation(format!(
            "button register {:#x} does not fit a {:#x} byte window",
            button, span
        )));
    }
    if cfg.poll_interval().is_zero() {
        return Err(ConfigError::Validation("ui poll_interval_ms must be > 0".into()));
    }
    if cfg.bus_options().spin_limit == 0 {
        return Err(ConfigError::Validation("panel spin_limit must be > 0".into()));
    }
    if cfg.bus_options().baud_divider == 0 {
        return Err(ConfigError::Validation("panel baud_divider must be > 0".into()));
    }
    Ok(())
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn device(&self) -> PathBuf {
        self.registers
            .as_ref()
            .and_then(|r| r.device.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE))
    }

    pub fn window_base(&self) -> u64 {
        self.registers.as_ref().and_then(|r| r.base).unwrap_or(DEFAULT_WINDOW_BASE)
    }

    pub fn window_span(&self) -> usize {
        self.registers.as_ref().and_then(|r| r.span).unwrap_or(DEFAULT_WINDOW_SPAN)
    }

    pub fn simulate(&self) -> bool {
        self.registers.as_ref().and_then(|r| r.simulate).unwrap_or(false)
    }

    pub fn layout(&self) -> HpsLayout {
        let d = HpsLayout::default();
        match self.registers.as_ref() {
            Some(r) => HpsLayout {
                gpio1: r.gpio1_offset.unwrap_or(d.gpio1),
                spim0: r.spim0_offset.unwrap_or(d.spim0),
                rstmgr: r.rstmgr_offset.unwrap_or(d.rstmgr),
            },
            None => d,
        }
    }

    pub fn button_offset(&self) -> usize {
        self.registers.as_ref().and_then(|r| r.button_offset).unwrap_or(DEFAULT_BUTTON_OFFSET)
    }

    pub fn bus_options(&self) -> BusOptions {
        let d = BusOptions::default();
        match self.panel.as_ref() {
            Some(p) => BusOptions {
                reset_pulse: p.reset_pulse_ms.map(Duration::from_millis).unwrap_or(d.reset_pulse),
                spin_limit: p.spin_limit.unwrap_or(d.spin_limit),
                baud_divider: p.baud_divider.unwrap_or(d.baud_divider),
            },
            None => d,
        }
    }

    pub fn panel_options(&self) -> PanelOptions {
        let d = PanelOptions::default();
        match self.panel.as_ref() {
            Some(p) => PanelOptions {
                settle_delay: p.settle_delay_ms.map(Duration::from_millis).unwrap_or(d.settle_delay),
                clear_before_display_on: p.clear_before_display_on.unwrap_or(d.clear_before_display_on),
            },
            None => d,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.ui.as_ref().and_then(|u| u.poll_interval_ms).unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn button_mask(&self) -> u32 {
        self.ui.as_ref().and_then(|u| u.button_mask).unwrap_or(DEFAULT_BUTTON_MASK)
    }

    /// Controller settings; `message_count` is fixed up from the table later
    pub fn mode_config(&self) -> ModeControllerConfig {
        let ui = self.ui.as_ref();
        ModeControllerConfig {
            idle_timeout: Duration::from_secs(
                ui.and_then(|u| u.idle_timeout_secs).unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            ),
            simultaneous: ui.and_then(|u| u.simultaneous_next_prev).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn message_table(&self) -> MessageTable {
        MessageTable::from_entries(self.messages.clone().unwrap_or_default())
    }
}
