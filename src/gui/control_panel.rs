//! Control Panel Widget
//! Left side panel with the period range, region selection, top-N and view controls.

use crate::data::{FilterState, Granularity, Period};
use egui::{Color32, RichText, ScrollArea, Slider};
use std::collections::HashSet;

/// Left side control panel producing the [`FilterState`] for each pass.
pub struct ControlPanel {
    pub regions: Vec<String>,
    pub selected_regions: Vec<bool>,
    /// Inclusive slider bounds as period indices.
    pub period_bounds: Option<(i32, i32)>,
    pub start_index: i32,
    pub end_index: i32,
    pub top_n: usize,
    pub default_top_n: usize,
    pub granularity: Granularity,
    pub status: String,
}

impl ControlPanel {
    pub fn new(default_top_n: usize, granularity: Granularity) -> Self {
        Self {
            regions: Vec::new(),
            selected_regions: Vec::new(),
            period_bounds: None,
            start_index: 0,
            end_index: 0,
            top_n: default_top_n.max(1),
            default_top_n: default_top_n.max(1),
            granularity,
            status: "Ready".to_string(),
        }
    }

    /// Refresh the widget options after the data was (re)loaded.
    ///
    /// Regions that were deselected stay deselected; new regions start selected.
    /// The first load selects the full period span; later loads keep the chosen
    /// range, clamped to the new bounds.
    pub fn update_options(&mut self, regions: Vec<String>, bounds: Option<(Period, Period)>) {
        let first_load = self.regions.is_empty();
        let deselected: HashSet<&String> = self
            .regions
            .iter()
            .zip(&self.selected_regions)
            .filter(|(_, &selected)| !selected)
            .map(|(region, _)| region)
            .collect();

        let selected_regions = regions
            .iter()
            .map(|region| !deselected.contains(region))
            .collect();
        self.selected_regions = selected_regions;
        self.regions = regions;

        let had_bounds = self.period_bounds.is_some();
        self.period_bounds = bounds.map(|(lo, hi)| (lo.index(), hi.index()));
        if let Some((lo, hi)) = self.period_bounds {
            if had_bounds {
                self.start_index = self.start_index.clamp(lo, hi);
                self.end_index = self.end_index.clamp(lo, hi);
            } else {
                self.start_index = lo;
                self.end_index = hi;
            }
        }

        if first_load {
            self.top_n = self.default_top_n.min(self.max_top_n());
        }
        self.clamp_top_n();
    }

    pub fn selected_region_names(&self) -> Vec<String> {
        self.regions
            .iter()
            .zip(self.selected_regions.iter())
            .filter(|(_, &selected)| selected)
            .map(|(region, _)| region.clone())
            .collect()
    }

    /// Upper bound of the top-N slider.
    pub fn max_top_n(&self) -> usize {
        self.selected_regions
            .iter()
            .filter(|&&selected| selected)
            .count()
            .max(1)
    }

    fn clamp_top_n(&mut self) {
        self.top_n = self.top_n.clamp(1, self.max_top_n());
    }

    /// Current filter values, or `None` before any data is loaded.
    pub fn filter_state(&self) -> Option<FilterState> {
        if self.period_bounds.is_none() {
            return None;
        }
        let start = Period::from_index(self.start_index)?;
        let end = Period::from_index(self.end_index)?;
        Some(FilterState::new(
            (start, end),
            self.selected_region_names(),
            self.top_n,
            self.granularity,
        ))
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;
        let mut changed = false;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🔥 Gas Sales")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Monthly sales by province")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        let Some((lo, hi)) = self.period_bounds else {
            ui.label(RichText::new("No data loaded").color(Color32::GRAY));
            ui.add_space(10.0);
            if ui.button("🔄 Reload data").clicked() {
                action = ControlPanelAction::ReloadData;
            }
            self.show_status(ui);
            return action;
        };

        // ===== Period Range Section =====
        ui.label(RichText::new("📅 Period Range (YYYY-MM)").size(14.0).strong());
        ui.add_space(5.0);

        for (label, index) in [("From", &mut self.start_index), ("To", &mut self.end_index)] {
            let slider = Slider::new(index, lo..=hi)
                .text(label)
                .custom_formatter(|value, _| {
                    Period::from_index(value.round() as i32)
                        .map(|p| p.label())
                        .unwrap_or_default()
                })
                .custom_parser(|text| Period::parse(text).map(|p| p.index() as f64));
            changed |= ui.add(slider).changed();
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Region Section =====
        ui.label(RichText::new("🗺 Regions").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("region_list")
                    .max_height(220.0)
                    .show(ui, |ui| {
                        for (region, selected) in
                            self.regions.iter().zip(self.selected_regions.iter_mut())
                        {
                            changed |= ui.checkbox(selected, region).changed();
                        }
                    });
            });

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.small_button("Select All").clicked() {
                self.selected_regions.iter_mut().for_each(|v| *v = true);
                changed = true;
            }
            if ui.small_button("Clear All").clicked() {
                self.selected_regions.iter_mut().for_each(|v| *v = false);
                changed = true;
            }
        });
        self.clamp_top_n();

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Top N Section =====
        ui.label(RichText::new("🏆 Top N (period total)").size(14.0).strong());
        ui.add_space(5.0);
        let max_n = self.max_top_n();
        changed |= ui
            .add(Slider::new(&mut self.top_n, 1..=max_n).integer())
            .changed();

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== View Section =====
        ui.label(RichText::new("📊 Chart Unit").size(14.0).strong());
        ui.add_space(5.0);
        ui.horizontal(|ui| {
            for granularity in Granularity::ALL {
                changed |= ui
                    .radio_value(&mut self.granularity, granularity, granularity.label())
                    .changed();
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("🔄 Reload data").size(14.0))
                .min_size(egui::vec2(150.0, 30.0));
            if ui.add(button).clicked() {
                action = ControlPanelAction::ReloadData;
            }
        });

        ui.add_space(10.0);
        self.show_status(ui);

        if changed && action == ControlPanelAction::None {
            action = ControlPanelAction::FiltersChanged;
        }
        action
    }

    fn show_status(&self, ui: &mut egui::Ui) {
        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));
    }

    /// Set status line
    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    FiltersChanged,
    ReloadData,
}
