/*
 *  main.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Demo driver: configure a panel and stream some text and shapes to it
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

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use oledstream::config::{self, Cli, DisplayConfig};
use oledstream::display::{
    Addressing, Canvas, Color, DisplayDriverFactory, PanelSimulator, Rotation,
};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let display = cfg
        .display
        .as_ref()
        .ok_or_else(|| anyhow!("no display configured (use a config file or --driver)"))?;
    let rotation = Rotation::from_degrees(display.rotate_deg.unwrap_or(0))?;

    if display.emulated.unwrap_or(false) {
        let (driver, mock) = DisplayDriverFactory::create_emulated(display)?;
        let mut canvas = Canvas::new(driver);
        run_demo(&mut canvas, display, rotation, &cli.text)?;

        let (width, height) = canvas.dimensions();
        let kind = canvas.driver().capabilities().color_depth.into();
        let mut sim = PanelSimulator::new(kind, width, height);
        let state = mock.state();
        let state = state.lock().map_err(|_| anyhow!("mock bus state poisoned"))?;
        sim.replay(&state.events);
        info!("{} bytes on the wire in {} transactions", state.bytes_sent, state.start_count);
        print!("{}", sim.to_ascii());
        return Ok(());
    }

    let driver = DisplayDriverFactory::create_from_config(display)?;
    let mut canvas = Canvas::new(driver);
    run_demo(&mut canvas, display, rotation, &cli.text)?;
    info!("Done");
    Ok(())
}

fn run_demo(canvas: &mut Canvas, display: &DisplayConfig, rotation: Rotation, text: &str) -> Result<()> {
    canvas.init().context("initializing display")?;
    DisplayDriverFactory::apply_settings(canvas.driver_mut().as_mut(), display)
        .context("applying display settings")?;

    canvas.clear_screen()?;
    let (width, height) = canvas.dimensions();
    let (right, bottom) = (width as i32 - 1, height as i32 - 1);

    // rotated text needs single pixel windows
    if rotation != Rotation::Deg0 && canvas.driver().addressing() == Addressing::Pages {
        if let Err(e) = canvas.set_addressing(Addressing::Rows) {
            warn!("Staying in page addressing: {}", e);
        }
    }
    let paged = canvas.driver().addressing() == Addressing::Pages;
    let rotation = if paged && rotation != Rotation::Deg0 {
        warn!("Rotated text needs row addressing, printing at 0°");
        Rotation::Deg0
    } else {
        rotation
    };

    canvas.set_color(Color::YELLOW);
    canvas.draw_rect(0, 0, right, bottom)?;

    canvas.set_color(Color::WHITE);
    let (x, y) = match rotation {
        Rotation::Deg0 => (2, 2),
        Rotation::Deg90 => (2, bottom - 2),
        Rotation::Deg180 => (right - 2, bottom - 2),
        Rotation::Deg270 => (right - 2, 2),
    };
    let drawn = canvas.print_fixed_rotated(x, y, text, rotation)?;
    info!("Printed {} glyphs at {}°", drawn, rotation.degrees());

    // points on page surfaces clear the rest of their page column
    if !paged {
        canvas.set_rgb(0, 160, 255);
        canvas.draw_line(2, bottom - 2, right - 2, bottom / 2)?;
    }
    Ok(())
}
