// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mockup Canvas
//!
//! A desktop application that turns an app description into a row of
//! generated UI screens laid out on an infinite canvas.

use anyhow::Result;
use mockup_canvas::app::MockupApp;
use mockup_canvas::config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::load()?;
    let app = MockupApp::new(config)?;

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Mockup Canvas"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Mockup Canvas",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
