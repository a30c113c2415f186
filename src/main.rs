// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Motion Tracker
//!
//! A desktop application that plays a video file, detects moving regions
//! with an adaptive background model and overlays either the motion mask or
//! bounding boxes around moving objects, with the soundtrack playing
//! alongside.

mod app;
mod backend;
mod config;
mod io;
mod models;
mod player;
mod scheduler;
mod ui;
mod util;
mod vision;

use anyhow::Result;
use app::MotionTrackerApp;
use config::Config;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Ignoring {}: {:#}", config::CONFIG_ENV, e);
            Config::default()
        }
    };
    log::info!("Settings: {:?}", config);

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Motion Tracker"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Motion Tracker",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(MotionTrackerApp::new(&config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
