//! Chart Plotter Module
//! Line and stacked bar charts of an aggregated view using egui_plot.

use crate::data::{AggregatedView, BucketKey, Granularity};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use polars::prelude::PolarsResult;
use std::collections::{BTreeMap, BTreeSet};

/// Color palette for regions
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

const CHART_HEIGHT: f32 = 360.0;
const BAR_WIDTH: f64 = 0.8;
const Y_AXIS_LABEL: &str = "Sales volume";

/// Totals of one region, one point per bucket it appears in.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSeries {
    pub region: String,
    pub points: Vec<(BucketKey, f64)>,
}

/// Chart-ready form of an [`AggregatedView`].
#[derive(Debug, Clone)]
pub struct ChartData {
    pub granularity: Granularity,
    /// Every bucket present in the view, ascending.
    pub buckets: Vec<BucketKey>,
    /// One series per region, in region order.
    pub series: Vec<RegionSeries>,
}

impl ChartData {
    pub fn from_view(view: &AggregatedView) -> PolarsResult<Self> {
        let mut buckets = BTreeSet::new();
        let mut by_region: BTreeMap<String, Vec<(BucketKey, f64)>> = BTreeMap::new();

        // rows arrive ordered by (bucket, region), so each series is already sorted
        for row in view.rows()? {
            buckets.insert(row.bucket);
            by_region
                .entry(row.region)
                .or_default()
                .push((row.bucket, row.total_value));
        }

        Ok(Self {
            granularity: view.granularity(),
            buckets: buckets.into_iter().collect(),
            series: by_region
                .into_iter()
                .map(|(region, points)| RegionSeries { region, points })
                .collect(),
        })
    }

    /// Per-region values aligned to `buckets`, zero where a region has no row.
    /// Stacking needs every bar chart to cover the same buckets in the same order.
    pub fn stacked_columns(&self) -> Vec<(String, Vec<f64>)> {
        self.series
            .iter()
            .map(|series| {
                let lookup: BTreeMap<BucketKey, f64> = series.points.iter().copied().collect();
                let values = self
                    .buckets
                    .iter()
                    .map(|bucket| lookup.get(bucket).copied().unwrap_or(0.0))
                    .collect();
                (series.region.clone(), values)
            })
            .collect()
    }
}

/// Draws the dashboard charts.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn region_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Axis tick text for a bucket position; blank between buckets.
    pub fn format_bucket(granularity: Granularity, value: f64) -> String {
        BucketKey::from_axis_value(granularity, value)
            .map(|key| key.label())
            .unwrap_or_default()
    }

    /// Line chart with point markers, one line per region
    pub fn draw_line_chart(ui: &mut egui::Ui, chart_data: &ChartData) {
        let granularity = chart_data.granularity;

        Plot::new("sales_line_chart")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label(granularity.axis_label())
            .y_axis_label(Y_AXIS_LABEL)
            .x_axis_formatter(move |mark, _range| Self::format_bucket(granularity, mark.value))
            .show(ui, |plot_ui| {
                for (idx, series) in chart_data.series.iter().enumerate() {
                    let color = Self::region_color(idx);
                    let points: Vec<[f64; 2]> = series
                        .points
                        .iter()
                        .map(|(bucket, total)| [bucket.axis_value(), *total])
                        .collect();

                    plot_ui.line(
                        Line::new(PlotPoints::from(points.clone()))
                            .color(color)
                            .width(2.0)
                            .name(&series.region),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from(points))
                            .radius(3.5)
                            .color(color)
                            .name(&series.region),
                    );
                }
            });
    }

    /// Stacked bar chart, regions stacked bottom to top in region order
    pub fn draw_stacked_bar_chart(ui: &mut egui::Ui, chart_data: &ChartData) {
        let granularity = chart_data.granularity;
        let columns = chart_data.stacked_columns();

        Plot::new("sales_bar_chart")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label(granularity.axis_label())
            .y_axis_label(Y_AXIS_LABEL)
            .x_axis_formatter(move |mark, _range| Self::format_bucket(granularity, mark.value))
            .show(ui, |plot_ui| {
                let mut charts: Vec<BarChart> = Vec::with_capacity(columns.len());

                for (idx, (region, values)) in columns.iter().enumerate() {
                    let bars: Vec<Bar> = chart_data
                        .buckets
                        .iter()
                        .zip(values)
                        .map(|(bucket, value)| {
                            Bar::new(bucket.axis_value(), *value)
                                .width(BAR_WIDTH)
                                .name(format!("{} {}", region, bucket.label()))
                        })
                        .collect();

                    let below: Vec<&BarChart> = charts.iter().collect();
                    let chart = BarChart::new(bars)
                        .color(Self::region_color(idx))
                        .name(region)
                        .stack_on(&below);
                    charts.push(chart);
                }

                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        DataLoader, DataProcessor, FilterAggregator, FilterState, Period, DEFAULT_PERIOD_COLUMN,
    };

    fn view(text: &str, granularity: Granularity) -> AggregatedView {
        let wide = DataLoader::parse_wide(text).unwrap();
        let table = DataProcessor::melt_regions(&wide, DEFAULT_PERIOD_COLUMN).unwrap();
        let range = table.period_bounds().unwrap();
        let state = FilterState::new(range, Vec::<String>::new(), 10, granularity);
        FilterAggregator::evaluate(&table, &state).unwrap().view
    }

    #[test]
    fn series_follow_region_order() {
        let v = view("연월,B,A\n2021-01,1,2\n2022-01,3,4\n", Granularity::Yearly);
        let data = ChartData::from_view(&v).unwrap();
        assert_eq!(data.buckets, vec![BucketKey::Year(2021), BucketKey::Year(2022)]);
        let names: Vec<&str> = data.series.iter().map(|s| s.region.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(
            data.series[0].points,
            vec![(BucketKey::Year(2021), 2.0), (BucketKey::Year(2022), 4.0)]
        );
    }

    #[test]
    fn stacked_columns_are_dense() {
        let v = view("연월,A\n2021-01,1\n2022-01,3\n", Granularity::ExactPeriod);
        let mut data = ChartData::from_view(&v).unwrap();
        // a region missing a bucket is padded with zero
        data.series.push(RegionSeries {
            region: "Z".into(),
            points: vec![(data.buckets[1], 7.0)],
        });
        let columns = data.stacked_columns();
        assert_eq!(columns[0], ("A".to_string(), vec![1.0, 3.0]));
        assert_eq!(columns[1], ("Z".to_string(), vec![0.0, 7.0]));
    }

    #[test]
    fn bucket_ticks_are_labelled() {
        let jan = Period::parse("2022-01").unwrap();
        assert_eq!(
            ChartPlotter::format_bucket(Granularity::ExactPeriod, jan.index() as f64),
            "2022-01"
        );
        assert_eq!(ChartPlotter::format_bucket(Granularity::Yearly, 2020.0), "2020");
        assert_eq!(ChartPlotter::format_bucket(Granularity::Monthly, 0.0), "");
        assert_eq!(ChartPlotter::format_bucket(Granularity::Monthly, 6.5), "");
    }
}
