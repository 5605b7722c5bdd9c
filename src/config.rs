/*
 *  config.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered with command line overrides
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
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

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

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Text rotation
    pub rotate_deg: Option<u16>,
    /// Only the SSD1351 can switch; the SSD1306 is always paged
    pub addressing: Option<AddressingMode>,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,     // 0-255
    /// Record traffic on a mock bus instead of opening devices
    pub emulated: Option<bool>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // e.g. 0x3C
    },
    Spi {
        bus: String,        // e.g. "/dev/spidev0.0"
        speed_hz: Option<u32>,
        dc_pin: u32,        // line offset on gpio_chip
        rst_pin: Option<u32>,
        gpio_chip: Option<String>, // defaults to /dev/gpiochip0
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    Ssd1351,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AddressingMode {
    Pages,
    Rows,
}

impl DriverKind {
    /// Panel geometries the driver has init tables for
    pub fn supported_sizes(&self) -> &'static [(u32, u32)] {
        match self {
            DriverKind::Ssd1306 => &[(128, 64), (128, 32)],
            DriverKind::Ssd1351 => &[(128, 128)],
        }
    }

    pub fn default_size(&self) -> (u32, u32) {
        self.supported_sizes()[0]
    }

    /// Fastest SPI clock the controller accepts
    pub fn max_bus_hz(&self) -> u32 {
        match self {
            DriverKind::Ssd1306 => 10_000_000,
            DriverKind::Ssd1351 => 4_000_000,
        }
    }
}

impl DisplayConfig {
    /// Configured size, or the driver's default
    pub fn size(&self) -> Option<(u32, u32)> {
        let (w, h) = self.driver?.default_size();
        Some((self.width.unwrap_or(w), self.height.unwrap_or(h)))
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "oledstream", about = "Stream text and shapes to an OLED panel", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long = "rotate-deg")]
    pub display_rotate_deg: Option<u16>,
    #[arg(long, value_enum)]
    pub addressing: Option<AddressingMode>,
    #[arg(long, action = ArgAction::Set)]
    pub display_invert: Option<bool>,
    #[arg(long)]
    pub brightness: Option<u8>,
    /// Draw into a simulated panel and print it
    #[arg(long, action = ArgAction::SetTrue)]
    pub emulated: bool,
    /// Text to print
    #[arg(long, default_value = "Hello from oledstream")]
    pub text: String,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, merge the CLI over it, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
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
    if let Some(home) = home_dir() {
        let p = home.join(".config/oledstream/config.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["oledstream.yaml", "config.yaml"] {
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
    Ok(serde_yaml::from_str(s)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()      { dst.driver = src.driver; }
    if src.width.is_some()       { dst.width = src.width; }
    if src.height.is_some()      { dst.height = src.height; }
    if src.rotate_deg.is_some()  { dst.rotate_deg = src.rotate_deg; }
    if src.addressing.is_some()  { dst.addressing = src.addressing; }
    if src.invert.is_some()      { dst.invert = src.invert; }
    if src.brightness.is_some()  { dst.brightness = src.brightness; }
    if src.emulated.is_some()    { dst.emulated = src.emulated; }
    if src.bus.is_some()         { dst.bus = src.bus; }
}

pub fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    let any_display = cli.driver.is_some()
        || cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.display_rotate_deg.is_some()
        || cli.addressing.is_some()
        || cli.display_invert.is_some()
        || cli.brightness.is_some()
        || cli.emulated;

    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.driver.is_some()              { display.driver = cli.driver; }
        if cli.display_width.is_some()       { display.width = cli.display_width; }
        if cli.display_height.is_some()      { display.height = cli.display_height; }
        if cli.display_rotate_deg.is_some()  { display.rotate_deg = cli.display_rotate_deg; }
        if cli.addressing.is_some()          { display.addressing = cli.addressing; }
        if cli.display_invert.is_some()      { display.invert = cli.display_invert; }
        if cli.brightness.is_some()          { display.brightness = cli.brightness; }
        if cli.emulated                      { display.emulated = Some(true); }
    }
}

/// Required fields, ranges and driver/bus pairing
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let Some(display) = cfg.display.as_ref() else {
        return Ok(());
    };
    if let (Some(w), Some(h)) = (display.width, display.height) {
        if w == 0 || h == 0 {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
    }
    if let Some(rot) = display.rotate_deg {
        match rot {
            0 | 90 | 180 | 270 => {},
            _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
        }
    }

    let Some(driver) = display.driver else {
        return Ok(());
    };
    if let Some(size) = display.size() {
        if !driver.supported_sizes().contains(&size) {
            return Err(ConfigError::Validation(format!(
                "{:?} does not support {}x{}",
                driver, size.0, size.1
            )));
        }
    }
    if driver == DriverKind::Ssd1306 && display.addressing == Some(AddressingMode::Rows) {
        return Err(ConfigError::Validation("ssd1306 only supports page addressing".into()));
    }
    if display.emulated.unwrap_or(false) {
        return Ok(());
    }
    match (driver, display.bus.as_ref()) {
        (_, None) => Err(ConfigError::Validation("display bus is required unless emulated".into())),
        (DriverKind::Ssd1351, Some(BusConfig::I2c { .. })) => {
            Err(ConfigError::Validation("ssd1351 needs an spi bus".into()))
        }
        _ => Ok(()),
    }
}
