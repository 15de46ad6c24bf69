//! Gas Sales Dashboard - monthly city-gas sales by province
//!
//! Loads the wide per-province sales CSV, reshapes it to long form and shows
//! filterable trend, stacked bar and table views.

mod charts;
mod config;
mod data;
mod gui;

use config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;
use gui::DashboardApp;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> eframe::Result<()> {
    let (config, config_error) = match DashboardConfig::load(Path::new(CONFIG_FILE)) {
        Ok(config) => (config, None),
        Err(e) => (DashboardConfig::default(), Some(e)),
    };

    // Logging: RUST_LOG wins over the configured filter
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();

    if let Some(e) = config_error {
        warn!("ignoring {CONFIG_FILE}, using defaults: {e:#}");
    }
    info!(data = %config.data_path.display(), "startup");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Gas Sales Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Gas Sales Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
}
