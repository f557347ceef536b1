//! Converter comparison harness
//!
//! Runs every converter that handles a document against it, scores each
//! result, and recommends a backend. This is a diagnostic tool: it drives
//! the same [`form_converters::Converter`] trait objects the production
//! factory uses, so any new backend shows up here once registered.
//!
//! # Features
//!
//! - **Scoring**: per-field label/type/value/confidence signals, averaged
//! - **Ranking**: best by confidence, by speed, and a weighted blend
//! - **Repetition**: optional iterations with percentile timing summaries
//! - **Reports**: console, JSON, and Markdown
//!
//! # Example
//!
//! ```no_run
//! use converter_harness::{ConverterHarness, HarnessConfig, OutputFormat, Reporter};
//! use form_converters::{ConverterConfig, ConverterFactory};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = HarnessConfig::from_file("harness.toml")?;
//! let factory = ConverterFactory::with_defaults(&ConverterConfig::from_env()?, None)?;
//! let report = ConverterHarness::new(factory, config)
//!     .compare(Path::new("intake.pdf"))
//!     .await;
//!
//! Reporter::new(OutputFormat::Console).report(&report)?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod reporter;
pub mod runner;
pub mod stats;

pub use analysis::{analyze_results, score_result, Analysis};
pub use config::{HarnessConfig, HarnessSettings};
pub use reporter::{OutputFormat, Reporter};
pub use runner::{ComparisonReport, ConversionMetrics, ConverterHarness, TimingSummary};
