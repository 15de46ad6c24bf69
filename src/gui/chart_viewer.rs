//! Chart Viewer Widget
//! Central scrollable dashboard: trend line chart, stacked bars and record tables.

use crate::charts::{ChartData, ChartPlotter};
use crate::data::{Evaluation, ObservationRecord, ObservationTable};
use egui::{Color32, RichText, ScrollArea};
use polars::prelude::PolarsResult;

const SECTION_SPACING: f32 = 15.0;
const FILTERED_TABLE_HEIGHT: f32 = 420.0;
const FULL_TABLE_HEIGHT: f32 = 500.0;
const TABLE_COL_WIDTH: f32 = 110.0;

const NO_MATCH_TEXT: &str = "No data matches the selected filters.";

/// Dashboard area fed by the latest evaluation pass.
#[derive(Default)]
pub struct ChartViewer {
    chart_data: Option<ChartData>,
    title_suffix: &'static str,
    top_regions: Vec<String>,
    filtered_rows: Vec<ObservationRecord>,
    all_rows: Vec<ObservationRecord>,
    load_error: Option<String>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the full long-form table for the "all records" section.
    pub fn set_table(&mut self, table: &ObservationTable) -> PolarsResult<()> {
        self.all_rows = table.records()?;
        self.load_error = None;
        Ok(())
    }

    pub fn set_evaluation(&mut self, evaluation: &Evaluation) -> PolarsResult<()> {
        self.load_error = None;
        self.title_suffix = evaluation.view.granularity().title_suffix();
        self.top_regions = evaluation.top_regions.clone();
        if evaluation.is_empty() {
            self.chart_data = None;
            self.filtered_rows.clear();
        } else {
            self.chart_data = Some(ChartData::from_view(&evaluation.view)?);
            self.filtered_rows = evaluation.filtered.records()?;
        }
        Ok(())
    }

    /// Replace every section with an error message until the next good pass.
    /// The full table is kept; a successful load replaces it.
    pub fn set_error(&mut self, message: String) {
        self.load_error = Some(message);
        self.chart_data = None;
        self.top_regions.clear();
        self.filtered_rows.clear();
    }

    pub fn format_value(value: Option<f64>) -> String {
        match value {
            Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
            Some(v) => format!("{v:.2}"),
            None => "-".to_string(),
        }
    }

    /// Draw the dashboard
    pub fn show(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = &self.load_error {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new(format!("⚠ Could not load data\n\n{error}"))
                        .size(16.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
            });
            return;
        }

        ScrollArea::vertical()
            .id_salt("dashboard")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                // ===== Line chart =====
                ui.heading("📈 Sales trend by region");
                ui.add_space(5.0);
                match &self.chart_data {
                    Some(data) => {
                        ui.label(
                            RichText::new(format!("Sales trend by region: {}", self.title_suffix))
                                .strong(),
                        );
                        ui.label(
                            RichText::new(format!(
                                "Top {} by total: {}",
                                self.top_regions.len(),
                                self.top_regions.join(", ")
                            ))
                            .small()
                            .color(Color32::GRAY),
                        );
                        ChartPlotter::draw_line_chart(ui, data);
                    }
                    None => Self::show_warning(ui, NO_MATCH_TEXT),
                }

                ui.add_space(SECTION_SPACING);

                // ===== Stacked bars =====
                ui.heading("🧱 Stacked sales by region");
                ui.add_space(5.0);
                match &self.chart_data {
                    Some(data) => {
                        ui.label(
                            RichText::new(format!(
                                "Sales by region, stacked: {}",
                                self.title_suffix
                            ))
                            .strong(),
                        );
                        ChartPlotter::draw_stacked_bar_chart(ui, data);
                    }
                    None => Self::show_warning(ui, NO_MATCH_TEXT),
                }

                ui.add_space(SECTION_SPACING);
                ui.separator();

                // ===== Tables =====
                ui.heading("🔎 Filtered records (long form)");
                ui.add_space(5.0);
                if self.filtered_rows.is_empty() {
                    ui.label(RichText::new("Nothing to show.").color(Color32::GRAY));
                } else {
                    Self::draw_records_table(
                        ui,
                        "filtered_records",
                        &self.filtered_rows,
                        FILTERED_TABLE_HEIGHT,
                    );
                }

                ui.add_space(SECTION_SPACING);
                egui::CollapsingHeader::new("📋 All long-form records")
                    .default_open(false)
                    .show(ui, |ui| {
                        Self::draw_records_table(
                            ui,
                            "all_records",
                            &self.all_rows,
                            FULL_TABLE_HEIGHT,
                        );
                    });
            });
    }

    fn show_warning(ui: &mut egui::Ui, text: &str) {
        egui::Frame::none()
            .fill(Color32::from_rgb(255, 243, 205))
            .rounding(5.0)
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.label(
                    RichText::new(format!("⚠ {text}")).color(Color32::from_rgb(133, 100, 4)),
                );
            });
    }

    /// Virtualized grid of long-form records; only visible rows are laid out.
    fn draw_records_table(
        ui: &mut egui::Ui,
        id: &str,
        rows: &[ObservationRecord],
        max_height: f32,
    ) {
        egui::Grid::new(format!("{id}_header"))
            .min_col_width(TABLE_COL_WIDTH)
            .show(ui, |ui| {
                for header in ["Period", "Region", "Sales", "Year", "Month"] {
                    ui.label(RichText::new(header).strong());
                }
                ui.end_row();
            });

        let row_height = ui.text_style_height(&egui::TextStyle::Body) + ui.spacing().item_spacing.y;
        ScrollArea::vertical()
            .id_salt(id)
            .max_height(max_height)
            .auto_shrink([false, true])
            .show_rows(ui, row_height, rows.len(), |ui, row_range| {
                egui::Grid::new(format!("{id}_body_{}", row_range.start))
                    .striped(true)
                    .min_col_width(TABLE_COL_WIDTH)
                    .show(ui, |ui| {
                        for record in &rows[row_range] {
                            ui.label(record.period.label());
                            ui.label(&record.region);
                            ui.label(Self::format_value(record.value));
                            ui.label(record.year.to_string());
                            ui.label(record.month.to_string());
                            ui.end_row();
                        }
                    });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        DataLoader, DataProcessor, FilterAggregator, FilterState, Granularity, Period,
        DEFAULT_PERIOD_COLUMN,
    };

    #[test]
    fn values_are_formatted_for_the_table() {
        assert_eq!(ChartViewer::format_value(Some(1200.0)), "1200");
        assert_eq!(ChartViewer::format_value(Some(3.14159)), "3.14");
        assert_eq!(ChartViewer::format_value(None), "-");
    }

    #[test]
    fn good_pass_clears_previous_error() {
        let wide = DataLoader::parse_wide("연월,A,B\n2022-01,1,2\n2022-02,3,4\n").unwrap();
        let table = DataProcessor::melt_regions(&wide, DEFAULT_PERIOD_COLUMN).unwrap();
        let range = (Period::new(2022, 1).unwrap(), Period::new(2022, 2).unwrap());
        let state = FilterState::new(range, Vec::new(), 2, Granularity::ExactPeriod);
        let evaluation = FilterAggregator::evaluate(&table, &state).unwrap();

        let mut viewer = ChartViewer::new();
        viewer.set_table(&table).unwrap();
        viewer.set_error("evaluation failed".to_string());
        assert!(viewer.load_error.is_some());
        assert!(viewer.chart_data.is_none());

        viewer.set_evaluation(&evaluation).unwrap();
        assert!(viewer.load_error.is_none());
        assert!(viewer.chart_data.is_some());
        assert_eq!(viewer.top_regions, vec!["B".to_string(), "A".to_string()]);
        assert_eq!(viewer.filtered_rows.len(), 4);
        assert_eq!(viewer.all_rows.len(), 4);
    }
}
