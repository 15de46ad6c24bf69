//! Data module - loading, reshaping, caching and filtering

mod cache;
mod filter;
mod loader;
mod period;
mod processor;

pub use cache::LoadCache;
pub use filter::{AggregatedView, BucketKey, Evaluation, FilterAggregator, FilterState, Granularity};
pub use period::Period;
pub use processor::{ObservationRecord, ObservationTable, DEFAULT_PERIOD_COLUMN};

// Reshape entry points for the chart and widget tests
#[cfg(test)]
pub use loader::DataLoader;
#[cfg(test)]
pub use processor::DataProcessor;
