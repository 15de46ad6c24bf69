//! Data Processor Module
//! Reshapes the wide sales table (one column per region) into long form.

use crate::data::loader::DataLoadError;
use crate::data::period::Period;
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Default header of the period column in the source file.
pub const DEFAULT_PERIOD_COLUMN: &str = "연월";

pub const PERIOD: &str = "period";
pub const REGION: &str = "region";
pub const VALUE: &str = "value";
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";

/// One (period, region) observation decoded from the long-form table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub period: Period,
    pub region: String,
    pub value: Option<f64>,
    pub year: i32,
    pub month: u32,
}

/// Long-form observations, ordered by (period, region).
///
/// Columns: `period` (String, `YYYY-MM`), `region` (String), `value`
/// (Float64, null when the source cell was not numeric), `year` and `month` (Int32).
#[derive(Debug, Clone)]
pub struct ObservationTable {
    df: DataFrame,
}

impl PartialEq for ObservationTable {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

impl ObservationTable {
    pub(crate) fn from_dataframe(df: DataFrame) -> Self {
        Self { df }
    }

    fn build_frame(
        periods: Vec<String>,
        regions: Vec<String>,
        values: Vec<Option<f64>>,
        years: Vec<i32>,
        months: Vec<i32>,
    ) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new(PERIOD.into(), periods),
            Column::new(REGION.into(), regions),
            Column::new(VALUE.into(), values),
            Column::new(YEAR.into(), years),
            Column::new(MONTH.into(), months),
        ])
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Distinct region names, sorted.
    pub fn regions(&self) -> Vec<String> {
        self.df
            .column(REGION)
            .ok()
            .and_then(|col| col.str().ok())
            .map(|ca| {
                ca.into_iter()
                    .flatten()
                    .collect::<BTreeSet<&str>>()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Earliest and latest period present.
    pub fn period_bounds(&self) -> Option<(Period, Period)> {
        let labels = self.df.column(PERIOD).ok()?.str().ok()?;
        let mut periods = labels.into_iter().flatten().filter_map(Period::parse);
        let first = periods.next()?;
        Some(periods.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Decode every row into an [`ObservationRecord`].
    pub fn records(&self) -> PolarsResult<Vec<ObservationRecord>> {
        let periods = self.df.column(PERIOD)?.str()?;
        let regions = self.df.column(REGION)?.str()?;
        let values = self.df.column(VALUE)?.f64()?;
        let years = self.df.column(YEAR)?.i32()?;
        let months = self.df.column(MONTH)?.i32()?;

        let records = periods
            .into_iter()
            .zip(regions)
            .zip(values)
            .zip(years)
            .zip(months)
            .filter_map(|((((period, region), value), year), month)| {
                Some(ObservationRecord {
                    period: Period::parse(period?)?,
                    region: region?.to_string(),
                    value,
                    year: year?,
                    month: u32::try_from(month?).ok()?,
                })
            })
            .collect();
        Ok(records)
    }
}

/// Handles the wide-to-long reshape and cell coercion.
pub struct DataProcessor;

impl DataProcessor {
    /// Coerce a raw cell into a sale quantity.
    ///
    /// Whitespace and thousands separators are ignored. Anything that still
    /// fails to parse, or is not finite, is treated as absent.
    pub fn coerce_value(cell: &str) -> Option<f64> {
        let cleaned: String = cell
            .trim()
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Transform one-row-per-period / one-column-per-region into one row per
    /// (period, region).
    ///
    /// Rows whose period label does not parse are dropped. Cells that do not
    /// parse as numbers become null values.
    pub fn melt_regions(
        wide: &DataFrame,
        period_column: &str,
    ) -> Result<ObservationTable, DataLoadError> {
        let period_labels = wide
            .column(period_column)
            .map_err(|_| DataLoadError::MissingPeriodColumn(period_column.to_string()))?
            .str()?;

        let mut region_columns: Vec<(String, &StringChunked)> = Vec::new();
        for column in wide.get_columns() {
            if column.name().as_str() != period_column {
                region_columns.push((column.name().to_string(), column.str()?));
            }
        }

        let capacity = wide.height() * region_columns.len();
        let mut periods: Vec<String> = Vec::with_capacity(capacity);
        let mut regions: Vec<String> = Vec::with_capacity(capacity);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(capacity);
        let mut years: Vec<i32> = Vec::with_capacity(capacity);
        let mut months: Vec<i32> = Vec::with_capacity(capacity);

        let mut seen: HashSet<Period> = HashSet::new();
        let mut dropped_rows = 0usize;
        let mut absent_cells = 0usize;

        for (row, label) in period_labels.into_iter().enumerate() {
            let Some(period) = label.and_then(Period::parse) else {
                debug!(row, label, "dropping row with unparseable period");
                dropped_rows += 1;
                continue;
            };
            if !seen.insert(period) {
                warn!(%period, "period appears on more than one source row");
            }

            let label = period.label();
            for (region, cells) in &region_columns {
                let value = cells.get(row).and_then(Self::coerce_value);
                if value.is_none() {
                    absent_cells += 1;
                }
                periods.push(label.clone());
                regions.push(region.clone());
                values.push(value);
                years.push(period.year());
                months.push(period.month() as i32);
            }
        }

        let df = ObservationTable::build_frame(periods, regions, values, years, months)?
            .sort([PERIOD, REGION], SortMultipleOptions::default())?;

        info!(
            records = df.height(),
            regions = region_columns.len(),
            dropped_rows,
            absent_cells,
            "reshaped to long form"
        );

        Ok(ObservationTable::from_dataframe(df))
    }
}
