//! Local OCR + text-layer converter
//!
//! Two strategies run side by side over page one of a PDF:
//!
//! - the embedded text layer, where lines shaped like `Label: value` or
//!   `Label ____` become field candidates and ALL-CAPS lines open sections;
//! - an OCR pass whose words are matched against a small label vocabulary to
//!   give fields pixel bounds.
//!
//! OCR runs on a dedicated worker thread that owns the engine. The worker is
//! started on first use and reused until [`Converter::cleanup`]. With the
//! `tesseract` feature the engine is leptess over pages rendered by
//! pdfium-render; without it the worker cannot start and conversions fall
//! back to the text layer.

use async_trait::async_trait;
use form_types::{Bounds, ConversionResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::OcrConfig;
use crate::converter::{ConversionOptions, Converter};
use crate::error::ConverterError;
use crate::gate::WatermarkGate;
use crate::pdf_text;
use crate::pipeline::{assemble, dedupe, Candidate};

#[cfg(feature = "tesseract")]
mod tesseract;
mod worker;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;
use worker::OcrWorker;

/// Words that mark a form label when OCR finds them on the page
pub const LABEL_VOCABULARY: &[&str] = &["name", "email", "phone", "address", "date", "signature"];

lazy_static! {
    static ref LABEL_VALUE_LINE: Regex =
        Regex::new(r"^([A-Za-z][^:]{0,60}?)\s*:\s*(.*)$").unwrap();
    static ref BLANK_LINE_FIELD: Regex =
        Regex::new(r"^([A-Za-z][^_]{0,60}?)\s*_{3,}[_\s]*$").unwrap();
    static ref CAPS_HEADING: Regex = Regex::new(r"^[A-Z][A-Z0-9\s&/]{2,}$").unwrap();
}

/// One recognised word with its box in rendered-page pixels
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    /// 0 to 100, as the engine reports it
    pub confidence: f64,
    pub bounds: Bounds,
}

/// Reads the words on page one of a PDF.
///
/// Built and used only on the worker thread, so implementations need not be
/// `Send`.
pub trait PageRecognizer {
    fn first_page_words(&mut self, pdf: &Path) -> Result<Vec<OcrWord>, ConverterError>;
}

/// Builds the engine on the worker thread
pub type EngineLauncher =
    Arc<dyn Fn(&OcrConfig) -> Result<Box<dyn PageRecognizer>, ConverterError> + Send + Sync>;

#[cfg(feature = "tesseract")]
fn launch_default(config: &OcrConfig) -> Result<Box<dyn PageRecognizer>, ConverterError> {
    Ok(Box::new(TesseractRecognizer::launch(config)?))
}

#[cfg(not(feature = "tesseract"))]
fn launch_default(_config: &OcrConfig) -> Result<Box<dyn PageRecognizer>, ConverterError> {
    Err(ConverterError::tool(
        "tesseract",
        "OCR engine not built in (enable the `tesseract` feature)",
    ))
}

pub struct OcrConverter {
    config: OcrConfig,
    timeout: Duration,
    gate: Option<WatermarkGate>,
    launch: EngineLauncher,
    worker: Mutex<Option<Arc<OcrWorker>>>,
    initializations: AtomicUsize,
}

impl OcrConverter {
    pub fn new(config: OcrConfig, timeout: Duration, gate: Option<WatermarkGate>) -> Self {
        Self::with_engine(config, timeout, gate, launch_default)
    }

    /// Use `launch` to build the engine instead of the built-in one
    pub fn with_engine<F>(config: OcrConfig, timeout: Duration, gate: Option<WatermarkGate>, launch: F) -> Self
    where
        F: Fn(&OcrConfig) -> Result<Box<dyn PageRecognizer>, ConverterError> + Send + Sync + 'static,
    {
        Self {
            config,
            timeout,
            gate,
            launch: Arc::new(launch),
            worker: Mutex::new(None),
            initializations: AtomicUsize::new(0),
        }
    }

    /// How many times a worker has been started
    pub fn worker_initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub async fn has_worker(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Start the worker unless a live one is already running
    async fn worker(&self) -> Result<Arc<OcrWorker>, ConverterError> {
        let mut slot = self.worker.lock().await;
        if let Some(worker) = slot.as_ref() {
            if !worker.is_finished() {
                return Ok(Arc::clone(worker));
            }
            warn!("OCR worker died, starting a new one");
        }

        let worker = Arc::new(OcrWorker::start(Arc::clone(&self.launch), self.config.clone()).await?);
        self.initializations.fetch_add(1, Ordering::SeqCst);
        info!(language = %self.config.language, dpi = self.config.dpi, "OCR worker started");

        *slot = Some(Arc::clone(&worker));
        Ok(worker)
    }

    /// Run OCR over page one
    #[instrument(skip(self))]
    pub async fn recognize(&self, pdf: &Path) -> Result<Vec<OcrWord>, ConverterError> {
        let worker = self.worker().await?;
        let words = worker.recognize(pdf, self.timeout).await?;
        debug!(words = words.len(), "OCR finished");
        Ok(words)
    }

    #[instrument(skip(self, options), fields(converter = "ocr"))]
    async fn run(&self, path: &Path, options: &ConversionOptions) -> Result<ConversionResult, ConverterError> {
        if options.watermark_check {
            if let Some(gate) = &self.gate {
                gate.check(path).await?;
            }
        }

        let bytes = tokio::fs::read(path).await?;
        let text_layer = tokio::task::spawn_blocking(move || pdf_text::first_page_text(&bytes));
        let ocr = async {
            if options.ocr_enabled {
                Some(self.recognize(path).await)
            } else {
                None
            }
        };
        let (text, words) = tokio::join!(text_layer, ocr);

        let words = match words {
            Some(Ok(words)) => words,
            Some(Err(e)) => {
                warn!(error = %e, "OCR pass failed, using the text layer alone");
                Vec::new()
            }
            None => Vec::new(),
        };
        let text = match text {
            Ok(Ok(text)) => text,
            Ok(Err(e)) if words.is_empty() => return Err(e),
            Err(e) if words.is_empty() => {
                return Err(ConverterError::Pdf(format!("text extraction aborted: {}", e)))
            }
            _ => {
                warn!("Text layer unreadable, using OCR words alone");
                String::new()
            }
        };

        let candidates = merge_ocr_hits(text_layer_candidates(&text), vocabulary_hits(&words));
        assemble(text, dedupe(candidates))
    }
}

/// Candidates from the embedded text, in reading order
pub fn text_layer_candidates(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut section: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = BLANK_LINE_FIELD.captures(line) {
            let label = caps[1].trim().trim_end_matches(':').trim_end();
            out.push(Candidate::new(label).with_section(section.clone()));
        } else if let Some(caps) = LABEL_VALUE_LINE.captures(line) {
            let value = caps[2].trim_matches(|c: char| c == '_' || c.is_whitespace());
            out.push(
                Candidate::new(caps[1].trim())
                    .with_value(value)
                    .with_section(section.clone()),
            );
        } else if CAPS_HEADING.is_match(line) {
            section = Some(line.to_string());
        }
    }
    out
}

/// OCR words that name a vocabulary label
pub fn vocabulary_hits(words: &[OcrWord]) -> Vec<(String, Bounds)> {
    words
        .iter()
        .filter_map(|word| {
            let key = word
                .text
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            LABEL_VOCABULARY
                .contains(&key.as_str())
                .then(|| (key, word.bounds))
        })
        .collect()
}

/// Give each hit's bounds to the first unbounded text candidate naming the
/// same word; hits with no such candidate become fields of their own.
pub fn merge_ocr_hits(mut candidates: Vec<Candidate>, hits: Vec<(String, Bounds)>) -> Vec<Candidate> {
    for (word, bounds) in hits {
        let target = candidates.iter_mut().find(|c| {
            c.bounds.is_none()
                && c.label
                    .to_lowercase()
                    .split(|ch: char| !ch.is_alphanumeric())
                    .any(|w| w == word)
        });
        match target {
            Some(candidate) => candidate.bounds = Some(bounds),
            None => out_of_layer(&mut candidates, &word, bounds),
        }
    }
    candidates
}

fn out_of_layer(candidates: &mut Vec<Candidate>, word: &str, bounds: Bounds) {
    let mut label = word.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    candidates.push(Candidate::new(label).with_bounds(Some(bounds)));
}

#[async_trait]
impl Converter for OcrConverter {
    fn name(&self) -> &'static str {
        "OcrConverter"
    }

    fn supports(&self, file_type: &str) -> bool {
        file_type == "pdf"
    }

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        match self.run(path, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR conversion failed");
                ConversionResult::failure(e.to_string())
            }
        }
    }

    async fn cleanup(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        match Arc::try_unwrap(worker) {
            Ok(worker) => {
                let thread = worker.shutdown();
                match tokio::task::spawn_blocking(move || thread.join()).await {
                    Ok(Ok(())) => info!("OCR worker stopped"),
                    _ => warn!("OCR worker did not stop cleanly"),
                }
            }
            // Pages still in flight hold the worker; it stops when they finish
            Err(_) => info!("OCR worker released"),
        }
    }
}
