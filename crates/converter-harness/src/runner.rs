//! Side-by-side converter runs
//!
//! Every converter registered for the document's extension converts the same
//! file. Converters run concurrently, bounded by `parallelism`, and each one
//! repeats its conversion `iterations` times in sequence. Results are
//! collected once all of them finish and reported in registration order.
//!
//! # Example
//!
//! ```no_run
//! use converter_harness::{ConverterHarness, HarnessConfig};
//! use form_converters::{ConverterConfig, ConverterFactory};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let factory = ConverterFactory::with_defaults(&ConverterConfig::from_env()?, None)?;
//! let harness = ConverterHarness::new(factory, HarnessConfig::default());
//! let report = harness.compare(Path::new("intake.pdf")).await;
//!
//! for line in &report.analysis.recommendations {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

use form_converters::{ConversionOptions, Converter, ConverterFactory};
use form_types::ConversionResult;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{analyze_results, score_result, Analysis};
use crate::config::HarnessConfig;
use crate::stats::PercentileSummary;

/// One converter's showing on one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetrics {
    pub converter: String,
    /// Median across iterations; this is the ranked duration
    pub duration_ms: u64,
    pub field_count: usize,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<TimingSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSummary {
    pub min_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub iterations: usize,
}

impl From<PercentileSummary> for TimingSummary {
    fn from(summary: PercentileSummary) -> Self {
        Self {
            min_ms: summary.min,
            p50_ms: summary.p50,
            p95_ms: summary.p95,
            max_ms: summary.max,
            mean_ms: summary.mean,
            iterations: summary.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub file: PathBuf,
    pub started_at: String,
    pub total_duration_ms: u64,
    pub iterations: u32,
    pub metrics: Vec<ConversionMetrics>,
    pub analysis: Analysis,
}

impl ComparisonReport {
    pub fn all_failed(&self) -> bool {
        self.metrics.iter().all(|m| m.error.is_some())
    }
}

pub struct ConverterHarness {
    factory: ConverterFactory,
    config: HarnessConfig,
}

impl ConverterHarness {
    pub fn new(factory: ConverterFactory, config: HarnessConfig) -> Self {
        Self { factory, config }
    }

    pub fn factory(&self) -> &ConverterFactory {
        &self.factory
    }

    fn options(&self) -> ConversionOptions {
        ConversionOptions {
            watermark_check: self.config.harness.watermark_check,
            ..ConversionOptions::default()
        }
    }

    /// Run every applicable converter on `path` and rank them
    #[instrument(skip(self, path), fields(file = %path.display()))]
    pub async fn compare(&self, path: &Path) -> ComparisonReport {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        let metrics = self.test_template(path).await;
        let analysis = analyze_results(&metrics);
        let total_duration_ms = start.elapsed().as_millis() as u64;

        if metrics.iter().all(|m| m.error.is_some()) {
            warn!(converters = metrics.len(), "No converter succeeded");
        } else {
            info!(
                best = %analysis.best_overall,
                duration_ms = total_duration_ms,
                "Comparison finished"
            );
        }

        ComparisonReport {
            file: path.to_path_buf(),
            started_at,
            total_duration_ms,
            iterations: self.config.harness.iterations,
            metrics,
            analysis,
        }
    }

    /// Metrics for each converter registered for the file's extension, in
    /// registration order. Empty when nothing handles the extension.
    pub async fn test_template(&self, path: &Path) -> Vec<ConversionMetrics> {
        let ext = watermark_detector::extension(path);
        let converters = self.factory.converters_for(&ext);
        if converters.is_empty() {
            warn!(ext = %ext, "No converter registered for file type");
            return Vec::new();
        }
        info!(converters = converters.len(), ext = %ext, "Running converters");

        let parallelism = self.config.harness.parallelism.max(1);
        let mut indexed: Vec<(usize, ConversionMetrics)> = stream::iter(converters.into_iter().enumerate())
            .map(|(i, converter)| async move { (i, self.test_single_converter(converter, path).await) })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, m)| m).collect()
    }

    /// Repeat one converter's conversion and summarize it. The first failed
    /// iteration ends the run and is reported as the converter's error.
    #[instrument(skip(self, converter, path), fields(converter = converter.name()))]
    pub async fn test_single_converter(
        &self,
        converter: Arc<dyn Converter>,
        path: &Path,
    ) -> ConversionMetrics {
        let options = self.options();
        let iterations = self.config.harness.iterations.max(1);
        let mut durations = Vec::with_capacity(iterations as usize);
        let mut last: Option<ConversionResult> = None;

        for i in 0..iterations {
            let start = Instant::now();
            let result = match AssertUnwindSafe(converter.convert(path, &options))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => ConversionResult::failure("Conversion failed: converter panicked"),
            };
            let elapsed = start.elapsed().as_secs_f64() * 1000.0;
            durations.push(elapsed);
            debug!(iteration = i, duration_ms = elapsed, success = result.success, "Iteration done");

            if !result.success {
                let error = result
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string());
                warn!(error = %error, "Converter failed");
                return ConversionMetrics {
                    converter: converter.name().to_string(),
                    duration_ms: elapsed.round() as u64,
                    field_count: 0,
                    confidence: 0.0,
                    error: Some(error),
                    timings: PercentileSummary::from_samples(&durations).map(TimingSummary::from),
                };
            }
            last = Some(result);
        }

        let summary = PercentileSummary::from_samples(&durations);
        let (field_count, confidence) = last
            .as_ref()
            .map(|r| (r.scored_fields().len(), score_result(r)))
            .unwrap_or((0, 0.0));

        ConversionMetrics {
            converter: converter.name().to_string(),
            duration_ms: summary.as_ref().map(|s| s.p50.round() as u64).unwrap_or(0),
            field_count,
            confidence,
            error: None,
            timings: summary.map(TimingSummary::from),
        }
    }
}
