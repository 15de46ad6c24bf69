//! Reporting Period Module
//! Month-resolution calendar values parsed from `YYYY-MM` labels.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A calendar year-month identifying one reporting row.
///
/// Ordering is chronological. The label form (`YYYY-MM`, zero padded) sorts
/// the same way, which is what lets the long-form table keep periods as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Parse a `YYYY-MM` label. Surrounding whitespace is ignored.
    ///
    /// The year must be exactly four digits and the month one or two digits;
    /// chrono alone would also take short or signed years.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if !Self::has_label_shape(label) {
            return None;
        }
        let date = NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d").ok()?;
        Self::new(date.year(), date.month())
    }

    fn has_label_shape(label: &str) -> bool {
        let Some((year, month)) = label.split_once('-') else {
            return false;
        };
        year.len() == 4
            && (1..=2).contains(&month.len())
            && year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year 0; consecutive periods differ by one.
    pub fn index(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::new(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
