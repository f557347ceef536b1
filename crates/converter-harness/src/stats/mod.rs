//! Timing statistics for repeated conversions

pub mod percentiles;

pub use percentiles::{percentile, PercentileSummary};
