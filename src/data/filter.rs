//! Filter & Aggregation Module
//! Applies the period range, region selection and top-N ranking to the long-form
//! table, then sums values into period / year / month-of-year buckets.

use crate::data::period::Period;
use crate::data::processor::{ObservationTable, MONTH, PERIOD, REGION, VALUE, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const TOTAL_VALUE: &str = "total_value";

/// Bucket size of the aggregated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One bucket per reporting period.
    ExactPeriod,
    /// One bucket per calendar year.
    #[default]
    Yearly,
    /// Twelve month-of-year buckets, summed across all years in range.
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::ExactPeriod,
        Granularity::Yearly,
        Granularity::Monthly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::ExactPeriod => "Period (raw)",
            Granularity::Yearly => "Yearly",
            Granularity::Monthly => "Monthly",
        }
    }

    /// Long-form column the view is grouped on.
    pub fn bucket_column(&self) -> &'static str {
        match self {
            Granularity::ExactPeriod => PERIOD,
            Granularity::Yearly => YEAR,
            Granularity::Monthly => MONTH,
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Granularity::ExactPeriod => "Period",
            Granularity::Yearly => "Year",
            Granularity::Monthly => "Month (1-12)",
        }
    }

    pub fn title_suffix(&self) -> &'static str {
        match self {
            Granularity::ExactPeriod => "monthly (by period)",
            Granularity::Yearly => "yearly totals",
            Granularity::Monthly => "monthly totals (within range)",
        }
    }
}

/// Widget state for one interaction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub period_range: (Period, Period),
    pub selected_regions: BTreeSet<String>,
    pub top_n: usize,
    pub granularity: Granularity,
}

impl FilterState {
    pub fn new(
        period_range: (Period, Period),
        selected_regions: impl IntoIterator<Item = String>,
        top_n: usize,
        granularity: Granularity,
    ) -> Self {
        Self {
            period_range,
            selected_regions: selected_regions.into_iter().collect(),
            top_n: top_n.max(1),
            granularity,
        }
    }
}

/// Grouping key of one aggregated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Period(Period),
    Year(i32),
    Month(u32),
}

impl BucketKey {
    /// Position on a chart's x axis. Adjacent buckets are one unit apart.
    pub fn axis_value(&self) -> f64 {
        match self {
            BucketKey::Period(p) => p.index() as f64,
            BucketKey::Year(y) => *y as f64,
            BucketKey::Month(m) => *m as f64,
        }
    }

    /// Inverse of [`BucketKey::axis_value`], used by axis formatters.
    pub fn from_axis_value(granularity: Granularity, value: f64) -> Option<Self> {
        if (value - value.round()).abs() > 1e-6 {
            return None;
        }
        let whole = value.round() as i64;
        match granularity {
            Granularity::ExactPeriod => {
                Period::from_index(i32::try_from(whole).ok()?).map(BucketKey::Period)
            }
            Granularity::Yearly => i32::try_from(whole).ok().map(BucketKey::Year),
            Granularity::Monthly => u32::try_from(whole)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .map(BucketKey::Month),
        }
    }

    pub fn label(&self) -> String {
        match self {
            BucketKey::Period(p) => p.label(),
            BucketKey::Year(y) => y.to_string(),
            BucketKey::Month(m) => m.to_string(),
        }
    }
}

/// One row of an [`AggregatedView`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub bucket: BucketKey,
    pub region: String,
    pub total_value: f64,
}

/// Sum of `value` per (bucket, region), ordered by (bucket, region).
#[derive(Debug, Clone)]
pub struct AggregatedView {
    granularity: Granularity,
    df: DataFrame,
}

impl AggregatedView {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn rows(&self) -> PolarsResult<Vec<ViewRow>> {
        let keys: Vec<Option<BucketKey>> = match self.granularity {
            Granularity::ExactPeriod => self
                .df
                .column(PERIOD)?
                .str()?
                .into_iter()
                .map(|label| label.and_then(Period::parse).map(BucketKey::Period))
                .collect(),
            Granularity::Yearly => self
                .df
                .column(YEAR)?
                .i32()?
                .into_iter()
                .map(|year| year.map(BucketKey::Year))
                .collect(),
            Granularity::Monthly => self
                .df
                .column(MONTH)?
                .i32()?
                .into_iter()
                .map(|month| {
                    month
                        .and_then(|m| u32::try_from(m).ok())
                        .map(BucketKey::Month)
                })
                .collect(),
        };
        let regions = self.df.column(REGION)?.str()?;
        let totals = self.df.column(TOTAL_VALUE)?.f64()?;

        Ok(keys
            .into_iter()
            .zip(regions)
            .zip(totals)
            .filter_map(|((bucket, region), total)| {
                Some(ViewRow {
                    bucket: bucket?,
                    region: region?.to_string(),
                    total_value: total.unwrap_or(0.0),
                })
            })
            .collect())
    }
}

/// Result of one filter/aggregate pass.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Records left after range, region and top-N filtering.
    pub filtered: ObservationTable,
    /// Regions kept by the top-N ranking, largest total first.
    pub top_regions: Vec<String>,
    pub view: AggregatedView,
}

impl Evaluation {
    /// True when the filters left nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Runs filtering, ranking and aggregation against the canonical table.
pub struct FilterAggregator;

impl FilterAggregator {
    /// Full interaction pass: filter, rank, aggregate.
    pub fn evaluate(table: &ObservationTable, state: &FilterState) -> PolarsResult<Evaluation> {
        let selected = Self::filter_range_and_regions(table, state)?;
        let (filtered, top_regions) = Self::retain_top_regions(&selected, state.top_n)?;
        let view = Self::aggregate(&filtered, state.granularity)?;

        debug!(
            selected = selected.len(),
            filtered = filtered.len(),
            regions = top_regions.len(),
            buckets = view.len(),
            granularity = state.granularity.label(),
            "evaluated filters"
        );

        Ok(Evaluation {
            filtered,
            top_regions,
            view,
        })
    }

    /// Keep records inside the inclusive period range and, when any region is
    /// selected, only the selected regions. An empty selection keeps every region.
    pub fn filter_range_and_regions(
        table: &ObservationTable,
        state: &FilterState,
    ) -> PolarsResult<ObservationTable> {
        let (start, end) = state.period_range;
        let mut lf = table.dataframe().clone().lazy().filter(
            col(PERIOD)
                .gt_eq(lit(start.label()))
                .and(col(PERIOD).lt_eq(lit(end.label()))),
        );

        if !state.selected_regions.is_empty() {
            let names: Vec<String> = state.selected_regions.iter().cloned().collect();
            lf = lf.filter(Self::region_in(&names));
        }

        Ok(ObservationTable::from_dataframe(lf.collect()?))
    }

    /// Rank regions by summed value (absent values skipped), largest first with
    /// ties in region order, and keep the first `top_n`.
    pub fn rank_regions(filtered: &ObservationTable, top_n: usize) -> PolarsResult<Vec<String>> {
        if filtered.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = filtered
            .dataframe()
            .clone()
            .lazy()
            .group_by([col(REGION)])
            .agg([col(VALUE).sum().fill_null(lit(0.0)).alias(TOTAL_VALUE)])
            .sort(
                [TOTAL_VALUE, REGION],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .limit(top_n.max(1) as IdxSize)
            .collect()?;

        Ok(ranked
            .column(REGION)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    /// Apply the top-N ranking and re-filter the records to the kept regions.
    pub fn retain_top_regions(
        filtered: &ObservationTable,
        top_n: usize,
    ) -> PolarsResult<(ObservationTable, Vec<String>)> {
        if filtered.is_empty() {
            return Ok((filtered.clone(), Vec::new()));
        }

        let top_regions = Self::rank_regions(filtered, top_n)?;
        let df = filtered
            .dataframe()
            .clone()
            .lazy()
            .filter(Self::region_in(&top_regions))
            .sort([PERIOD, REGION], SortMultipleOptions::default())
            .collect()?;

        Ok((ObservationTable::from_dataframe(df), top_regions))
    }

    /// Sum values per (bucket, region) for the requested granularity.
    pub fn aggregate(
        filtered: &ObservationTable,
        granularity: Granularity,
    ) -> PolarsResult<AggregatedView> {
        let bucket = granularity.bucket_column();
        let df = filtered
            .dataframe()
            .clone()
            .lazy()
            .group_by([col(bucket), col(REGION)])
            .agg([col(VALUE).sum().fill_null(lit(0.0)).alias(TOTAL_VALUE)])
            .sort([bucket, REGION], SortMultipleOptions::default())
            .collect()?;

        Ok(AggregatedView { granularity, df })
    }

    fn region_in(names: &[String]) -> Expr {
        col(REGION).is_in(lit(Series::new("regions".into(), names)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::DataLoader;
    use crate::data::processor::{DataProcessor, DEFAULT_PERIOD_COLUMN};

    const SAMPLE: &str = "연월,Busan,Daegu,Seoul,Ulsan\n\
                          2021-11,30,5,100,x\n\
                          2021-12,35,5,120,\n\
                          2022-01,40,5,130,2\n\
                          2022-02,45,abc,140,2\n\
                          2022-03,50,5,150,2\n";

    fn table(text: &str) -> ObservationTable {
        let wide = DataLoader::parse_wide(text).unwrap();
        DataProcessor::melt_regions(&wide, DEFAULT_PERIOD_COLUMN).unwrap()
    }

    fn period(label: &str) -> Period {
        Period::parse(label).unwrap()
    }

    fn full_range(table: &ObservationTable) -> (Period, Period) {
        table.period_bounds().unwrap()
    }

    fn state(
        range: (Period, Period),
        regions: &[&str],
        top_n: usize,
        granularity: Granularity,
    ) -> FilterState {
        FilterState::new(
            range,
            regions.iter().map(|r| r.to_string()),
            top_n,
            granularity,
        )
    }

    #[test]
    fn yearly_view_keeps_regions_with_only_absent_values() {
        let t = table("연월,SeoulA,SeoulB\n2022-01,100,abc\n");
        let s = state(full_range(&t), &[], 10, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();

        let rows = eval.view.rows().unwrap();
        assert_eq!(
            rows,
            vec![
                ViewRow {
                    bucket: BucketKey::Year(2022),
                    region: "SeoulA".into(),
                    total_value: 100.0,
                },
                ViewRow {
                    bucket: BucketKey::Year(2022),
                    region: "SeoulB".into(),
                    total_value: 0.0,
                },
            ]
        );
    }

    #[test]
    fn inverted_range_is_empty_not_an_error() {
        let t = table(SAMPLE);
        let s = state((period("2022-02"), period("2022-01")), &[], 3, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert!(eval.is_empty());
        assert_eq!(eval.view.len(), 0);
        assert!(eval.top_regions.is_empty());
    }

    #[test]
    fn range_is_inclusive_at_both_ends() {
        let t = table(SAMPLE);
        let s = state((period("2021-12"), period("2022-01")), &[], 10, Granularity::ExactPeriod);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        let periods: BTreeSet<String> = eval
            .filtered
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.period.label())
            .collect();
        assert_eq!(
            periods,
            BTreeSet::from(["2021-12".to_string(), "2022-01".to_string()])
        );
        assert_eq!(eval.filtered.len(), 2 * 4);
    }

    #[test]
    fn empty_selection_passes_everything_through() {
        let t = table(SAMPLE);
        let all = t.regions();
        let all_refs: Vec<&str> = all.iter().map(String::as_str).collect();

        let none = state(full_range(&t), &[], 2, Granularity::Monthly);
        let every = state(full_range(&t), &all_refs, 2, Granularity::Monthly);

        let a = FilterAggregator::filter_range_and_regions(&t, &none).unwrap();
        let b = FilterAggregator::filter_range_and_regions(&t, &every).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), t.len());

        let ea = FilterAggregator::evaluate(&t, &none).unwrap();
        let eb = FilterAggregator::evaluate(&t, &every).unwrap();
        assert_eq!(ea.top_regions, eb.top_regions);
        assert_eq!(ea.view.rows().unwrap(), eb.view.rows().unwrap());
    }

    #[test]
    fn region_selection_limits_ranking() {
        let t = table(SAMPLE);
        let s = state(full_range(&t), &["Daegu", "Ulsan"], 10, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert_eq!(eval.top_regions, vec!["Daegu", "Ulsan"]);
        assert!(eval
            .filtered
            .records()
            .unwrap()
            .iter()
            .all(|r| r.region == "Daegu" || r.region == "Ulsan"));
    }

    #[test]
    fn top_n_orders_by_total_and_breaks_ties_by_region() {
        let t = table("연월,Gamma,Alpha,Beta\n2022-01,5,5,9\n");
        let s = state(full_range(&t), &[], 3, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert_eq!(eval.top_regions, vec!["Beta", "Alpha", "Gamma"]);

        let s = state(full_range(&t), &[], 2, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert_eq!(eval.top_regions, vec!["Beta", "Alpha"]);
        assert_eq!(t.regions().len(), 3);
        assert_eq!(eval.filtered.regions(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn ranking_uses_filtered_window_only() {
        let t = table("연월,A,B\n2021-01,1000,1\n2022-01,1,50\n");
        let s = state((period("2022-01"), period("2022-12")), &[], 1, Granularity::Yearly);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert_eq!(eval.top_regions, vec!["B"]);
    }

    #[test]
    fn top_n_is_monotonic() {
        let t = table(SAMPLE);
        let region_count = t.regions().len();
        let mut previous: BTreeSet<String> = BTreeSet::new();
        for n in 1..=region_count + 1 {
            let s = state(full_range(&t), &[], n, Granularity::Yearly);
            let kept: BTreeSet<String> = FilterAggregator::evaluate(&t, &s)
                .unwrap()
                .top_regions
                .into_iter()
                .collect();
            assert!(kept.is_superset(&previous), "top {n} dropped a region");
            assert_eq!(kept.len(), n.min(region_count));
            previous = kept;
        }
    }

    #[test]
    fn zero_top_n_is_clamped_to_one() {
        let t = table(SAMPLE);
        let s = state(full_range(&t), &[], 0, Granularity::Yearly);
        assert_eq!(s.top_n, 1);
        let eval = FilterAggregator::evaluate(&t, &s).unwrap();
        assert_eq!(eval.top_regions, vec!["Seoul"]);
    }

    #[test]
    fn view_total_matches_filtered_sum_for_every_granularity() {
        let t = table(SAMPLE);
        let ranges = [
            full_range(&t),
            (period("2021-12"), period("2022-02")),
            (period("2022-03"), period("2022-03")),
        ];
        for range in ranges {
            for top_n in [1, 2, 4] {
                for granularity in Granularity::ALL {
                    let s = state(range, &[], top_n, granularity);
                    let eval = FilterAggregator::evaluate(&t, &s).unwrap();
                    let expected: f64 = eval
                        .filtered
                        .records()
                        .unwrap()
                        .iter()
                        .filter_map(|r| r.value)
                        .sum();
                    let total: f64 =
                        eval.view.rows().unwrap().iter().map(|r| r.total_value).sum();
                    assert!(
                        (total - expected).abs() < 1e-9,
                        "{granularity:?} top {top_n}: {total} != {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn monthly_view_folds_years_together() {
        let t = table("연월,A\n2021-01,1\n2022-01,2\n2022-02,4\n");
        let s = state(full_range(&t), &[], 5, Granularity::Monthly);
        let rows = FilterAggregator::evaluate(&t, &s).unwrap().view.rows().unwrap();
        let pairs: Vec<(BucketKey, f64)> = rows.iter().map(|r| (r.bucket, r.total_value)).collect();
        assert_eq!(pairs, vec![(BucketKey::Month(1), 3.0), (BucketKey::Month(2), 4.0)]);
    }

    #[test]
    fn exact_period_view_is_ordered_by_period_then_region() {
        let t = table(SAMPLE);
        let s = state(full_range(&t), &[], 4, Granularity::ExactPeriod);
        let rows = FilterAggregator::evaluate(&t, &s).unwrap().view.rows().unwrap();
        assert_eq!(rows.len(), 5 * 4);
        let keys: Vec<(BucketKey, String)> =
            rows.iter().map(|r| (r.bucket, r.region.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(rows[0].bucket, BucketKey::Period(period("2021-11")));
    }

    #[test]
    fn axis_values_round_trip_to_bucket_keys() {
        let key = BucketKey::Period(period("2022-07"));
        assert_eq!(
            BucketKey::from_axis_value(Granularity::ExactPeriod, key.axis_value()),
            Some(key)
        );
        assert_eq!(
            BucketKey::from_axis_value(Granularity::Monthly, 13.0),
            None
        );
        assert_eq!(BucketKey::from_axis_value(Granularity::Yearly, 2021.5), None);
        assert_eq!(BucketKey::Month(3).label(), "3");
    }
}
