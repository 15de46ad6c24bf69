//! Gas Sales Dashboard Main Application
//! Main window with control panel and dashboard viewer.
//!
//! Every interaction runs one synchronous pass on the UI thread: fetch the
//! (memoized) long-form table, build the filter state, evaluate, hand the
//! result to the viewer.

use crate::config::DashboardConfig;
use crate::data::{FilterAggregator, LoadCache, ObservationTable};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use anyhow::Context;
use egui::SidePanel;
use std::path::Path;
use tracing::{debug, error, info, warn};

const EXTRA_FONT: &str = "dashboard_extra";

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    cache: LoadCache,
    seen_revision: u64,
    load_failed: bool,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl DashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        if let Some(font_path) = &config.font_path {
            match Self::install_font(&cc.egui_ctx, font_path) {
                Ok(()) => info!(font = %font_path.display(), "installed extra font"),
                Err(e) => warn!("font not installed: {e:#}"),
            }
        }

        let mut app = Self {
            cache: LoadCache::new(config.cache_ttl(), config.period_column.clone()),
            seen_revision: 0,
            load_failed: false,
            control_panel: ControlPanel::new(config.default_top_n, config.default_granularity),
            chart_viewer: ChartViewer::new(),
            config,
        };
        app.run_pass();
        app
    }

    /// Add a fallback font so Hangul region names render.
    fn install_font(ctx: &egui::Context, font_path: &Path) -> anyhow::Result<()> {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("reading {}", font_path.display()))?;

        let mut fonts = egui::FontDefinitions::default();
        fonts.font_data.insert(
            EXTRA_FONT.to_owned(),
            egui::FontData::from_owned(bytes).into(),
        );
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts
                .families
                .entry(family)
                .or_default()
                .push(EXTRA_FONT.to_owned());
        }
        ctx.set_fonts(fonts);
        Ok(())
    }

    /// Fetch the long-form table through the cache; refresh widget options when
    /// the cache actually re-read the file.
    fn current_table(&mut self) -> Option<ObservationTable> {
        if self.load_failed {
            return None;
        }

        let path = self.config.data_path.clone();
        let table = match self.cache.load(&path) {
            Ok(table) => table.clone(),
            Err(e) => {
                error!(path = %path.display(), "data load failed: {e}");
                self.load_failed = true;
                self.control_panel.set_status(&format!("Error: {e}"));
                self.chart_viewer.set_error(e.to_string());
                return None;
            }
        };

        if self.cache.revision() != self.seen_revision {
            self.seen_revision = self.cache.revision();
            let bounds = table.period_bounds();
            self.control_panel.update_options(table.regions(), bounds);

            if let Err(e) = self.chart_viewer.set_table(&table) {
                error!("failed to decode records: {e}");
            }

            let span = bounds
                .map(|(lo, hi)| format!(" ({lo} to {hi})"))
                .unwrap_or_default();
            self.control_panel.set_status(&format!(
                "Loaded {} records, {} regions{}",
                table.len(),
                table.regions().len(),
                span
            ));
        }

        Some(table)
    }

    /// One full recomputation for the current widget values.
    fn run_pass(&mut self) {
        let Some(table) = self.current_table() else {
            return;
        };
        let Some(state) = self.control_panel.filter_state() else {
            debug!("no filter state yet");
            return;
        };

        match FilterAggregator::evaluate(&table, &state) {
            Ok(evaluation) => {
                if evaluation.is_empty() {
                    info!("filters matched no records");
                }
                if let Err(e) = self.chart_viewer.set_evaluation(&evaluation) {
                    error!("failed to prepare charts: {e}");
                    self.chart_viewer.set_error(e.to_string());
                }
            }
            Err(e) => {
                error!("evaluation failed: {e}");
                self.control_panel.set_status(&format!("Error: {e}"));
                self.chart_viewer.set_error(e.to_string());
            }
        }
    }

    fn handle_reload(&mut self) {
        info!(path = %self.config.data_path.display(), "reload requested");
        self.cache.invalidate(&self.config.data_path);
        self.load_failed = false;
        self.run_pass();
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::FiltersChanged => self.run_pass(),
                        ControlPanelAction::ReloadData => self.handle_reload(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
