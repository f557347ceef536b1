//! Harness runs against scripted converters

use async_trait::async_trait;
use converter_harness::{ConverterHarness, HarnessConfig, HarnessSettings};
use form_converters::{ConversionOptions, Converter, ConverterFactory};
use form_engine::build_field;
use form_types::{ConversionContent, ConversionResult};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy)]
enum Outcome {
    /// Every field labeled and valued
    Complete,
    /// Labeled fields without values
    Sparse,
    Fails,
    Panics,
}

#[derive(Default)]
struct Tally {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    options: Mutex<Vec<ConversionOptions>>,
}

struct Scripted {
    name: &'static str,
    delay: Duration,
    outcome: Outcome,
    tally: Arc<Tally>,
}

#[async_trait]
impl Converter for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, file_type: &str) -> bool {
        file_type == "pdf"
    }

    async fn convert(&self, _path: &Path, options: &ConversionOptions) -> ConversionResult {
        self.tally.calls.fetch_add(1, Ordering::SeqCst);
        self.tally.options.lock().unwrap().push(*options);
        let now = self.tally.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.tally.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fields = match self.outcome {
            Outcome::Complete => vec![
                build_field("Employee Email", "").with_value("ops@example.com"),
                build_field("Start Date", "").with_value("01/02/2026"),
            ],
            Outcome::Sparse => vec![build_field("Notes", ""), build_field("Comments", "")],
            Outcome::Fails => return ConversionResult::failure("inference error: connection refused"),
            Outcome::Panics => panic!("renderer exploded"),
        };
        ConversionResult::success(
            ConversionContent::Document {
                text: String::new(),
                fields,
            },
            vec![],
            0.6,
        )
    }
}

fn scripted(name: &'static str, delay_ms: u64, outcome: Outcome, tally: &Arc<Tally>) -> Arc<dyn Converter> {
    Arc::new(Scripted {
        name,
        delay: Duration::from_millis(delay_ms),
        outcome,
        tally: Arc::clone(tally),
    })
}

fn harness(converters: Vec<Arc<dyn Converter>>, settings: HarnessSettings) -> ConverterHarness {
    let mut factory = ConverterFactory::new();
    for converter in converters {
        factory.register(converter);
    }
    ConverterHarness::new(factory, HarnessConfig { harness: settings })
}

#[tokio::test]
async fn test_compare_ranks_and_keeps_registration_order() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![
            scripted("SlowComplete", 120, Outcome::Complete, &tally),
            scripted("FastSparse", 5, Outcome::Sparse, &tally),
            scripted("Broken", 1, Outcome::Fails, &tally),
        ],
        HarnessSettings::default(),
    );

    let report = harness.compare(Path::new("intake.pdf")).await;

    let names: Vec<_> = report.metrics.iter().map(|m| m.converter.as_str()).collect();
    assert_eq!(names, vec!["SlowComplete", "FastSparse", "Broken"]);

    let broken = &report.metrics[2];
    assert_eq!(broken.error.as_deref(), Some("inference error: connection refused"));
    assert_eq!(broken.confidence, 0.0);
    assert_eq!(broken.field_count, 0);

    assert_eq!(report.metrics[0].field_count, 2);
    assert!(report.metrics[0].confidence > report.metrics[1].confidence);
    assert_eq!(report.analysis.best_confidence, "SlowComplete");
    assert_eq!(report.analysis.best_speed, "FastSparse");
    assert!(report.analysis.recommendations[0].starts_with("Best overall converter: "));
    assert!(report
        .analysis
        .recommendations
        .contains(&format!("Fastest conversion: FastSparse ({}ms)", report.metrics[1].duration_ms)));
    assert!(!report.all_failed());

    // All three started before any finished
    assert_eq!(tally.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_parallelism_bounds_concurrent_converters() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![
            scripted("A", 30, Outcome::Sparse, &tally),
            scripted("B", 30, Outcome::Sparse, &tally),
            scripted("C", 30, Outcome::Sparse, &tally),
        ],
        HarnessSettings {
            parallelism: 1,
            ..HarnessSettings::default()
        },
    );

    let metrics = harness.test_template(Path::new("form.PDF")).await;
    assert_eq!(metrics.len(), 3);
    assert_eq!(tally.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_iterations_repeat_and_summarize() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![scripted("Repeated", 2, Outcome::Complete, &tally)],
        HarnessSettings {
            iterations: 4,
            watermark_check: false,
            ..HarnessSettings::default()
        },
    );

    let report = harness.compare(Path::new("form.pdf")).await;

    assert_eq!(tally.calls.load(Ordering::SeqCst), 4);
    let timings = report.metrics[0].timings.as_ref().unwrap();
    assert_eq!(timings.iterations, 4);
    assert!(timings.min_ms <= timings.p50_ms && timings.p50_ms <= timings.max_ms);
    assert_eq!(report.metrics[0].duration_ms, timings.p50_ms.round() as u64);
    assert_eq!(report.iterations, 4);

    let options = tally.options.lock().unwrap();
    assert!(options.iter().all(|o| !o.watermark_check && o.ocr_enabled));
}

#[tokio::test]
async fn test_failure_stops_iterating() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![scripted("Broken", 1, Outcome::Fails, &tally)],
        HarnessSettings {
            iterations: 5,
            ..HarnessSettings::default()
        },
    );

    let metrics = harness.test_template(Path::new("form.pdf")).await;
    assert_eq!(tally.calls.load(Ordering::SeqCst), 1);
    assert_eq!(metrics[0].timings.as_ref().unwrap().iterations, 1);
}

#[tokio::test]
async fn test_panicking_converter_is_a_failure() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![
            scripted("Panics", 1, Outcome::Panics, &tally),
            scripted("Sparse", 1, Outcome::Sparse, &tally),
        ],
        HarnessSettings::default(),
    );

    let report = harness.compare(Path::new("form.pdf")).await;
    assert_eq!(
        report.metrics[0].error.as_deref(),
        Some("Conversion failed: converter panicked")
    );
    assert_eq!(report.analysis.best_overall, "Sparse");
    // Fields without values cannot reach 0.7
    assert!(report
        .analysis
        .recommendations
        .contains(&"Warning: Low confidence scores, manual verification recommended".to_string()));
}

#[tokio::test]
async fn test_all_failed() {
    let tally = Arc::new(Tally::default());
    let harness = harness(
        vec![
            scripted("A", 1, Outcome::Fails, &tally),
            scripted("B", 1, Outcome::Fails, &tally),
        ],
        HarnessSettings::default(),
    );

    let report = harness.compare(Path::new("form.pdf")).await;
    assert!(report.all_failed());
    assert_eq!(report.analysis.best_overall, "none");
    assert_eq!(report.analysis.recommendations, vec!["All converters failed".to_string()]);
}
