//! Watermark detection for PDF and Office documents
//!
//! Sample and marketing templates carry overlays ("www.example.ng sample
//! document", "DRAFT") that disqualify them as conversion sources. This crate
//! finds them.
//!
//! Detector failures never surface as errors from the verdict API. They come
//! back as [`WatermarkVerdict::Unknown`] and a [`WatermarkPolicy`] decides
//! whether that blocks the document.
//!
//! # Example
//!
//! ```no_run
//! use watermark_detector::{WatermarkDetector, WatermarkPolicy};
//!
//! # fn example() -> Result<(), watermark_detector::WatermarkError> {
//! let detector = WatermarkDetector::from_env()?;
//! let verdict = detector.detect_path("templates/lease.pdf".as_ref());
//! if WatermarkPolicy::FailOpen.rejects(&verdict) {
//!     println!("rejected: {:?}", verdict);
//! }
//! # Ok(())
//! # }
//! ```

pub mod office;
pub mod pdf;
pub mod rules;

pub use form_types::{WatermarkDetectionResult, WatermarkVerdict};
pub use rules::WatermarkRules;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use rules::CompiledRules;

/// Errors raised while scanning a document
#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Invalid office document: {0}")]
    InvalidOffice(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid watermark pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to load watermark rules: {0}")]
    RulesError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<lopdf::Error> for WatermarkError {
    fn from(e: lopdf::Error) -> Self {
        WatermarkError::InvalidPdf(e.to_string())
    }
}

impl From<zip::result::ZipError> for WatermarkError {
    fn from(e: zip::result::ZipError) -> Self {
        WatermarkError::InvalidOffice(e.to_string())
    }
}

/// What to do with a document whose scan could not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPolicy {
    /// Treat it as clean
    #[default]
    FailOpen,
    /// Reject it
    FailClosed,
}

impl WatermarkPolicy {
    pub fn rejects(&self, verdict: &WatermarkVerdict) -> bool {
        match verdict {
            WatermarkVerdict::Clean => false,
            WatermarkVerdict::Watermarked(_) => true,
            WatermarkVerdict::Unknown { .. } => *self == WatermarkPolicy::FailClosed,
        }
    }

    /// `fail-open` or `fail-closed`; anything else is None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Some(WatermarkPolicy::FailOpen),
            "fail-closed" | "closed" => Some(WatermarkPolicy::FailClosed),
            _ => None,
        }
    }
}

/// Format-aware detector; cheap to clone
#[derive(Debug, Clone)]
pub struct WatermarkDetector {
    rules: Arc<CompiledRules>,
}

impl WatermarkDetector {
    pub fn new(rules: WatermarkRules) -> Result<Self, WatermarkError> {
        Ok(Self {
            rules: Arc::new(rules.compile()?),
        })
    }

    /// Detector using `WATERMARK_RULES_PATH` when set
    pub fn from_env() -> Result<Self, WatermarkError> {
        Self::new(WatermarkRules::from_env()?)
    }

    pub fn rules(&self) -> &WatermarkRules {
        &self.rules.rules
    }

    /// Scan a PDF, surfacing failures as errors
    pub fn scan_pdf(&self, path: &Path) -> Result<WatermarkDetectionResult, WatermarkError> {
        let bytes = std::fs::read(path)?;
        pdf::scan_bytes(&bytes, &self.rules)
    }

    pub fn scan_pdf_bytes(&self, bytes: &[u8]) -> Result<WatermarkDetectionResult, WatermarkError> {
        pdf::scan_bytes(bytes, &self.rules)
    }

    /// First configured Office keyword found in the document, if any
    pub fn scan_office(&self, path: &Path) -> Result<Option<String>, WatermarkError> {
        let text = match extension(path).as_str() {
            "docx" => office::docx_text(path)?,
            "xlsx" => office::xlsx_text(path)?,
            other => return Err(WatermarkError::UnsupportedFileType(other.to_string())),
        };
        let lower = text.to_lowercase();
        Ok(self.rules.office_keyword_in(&lower).map(str::to_string))
    }

    pub fn detect_pdf_watermark(&self, path: &Path) -> WatermarkVerdict {
        match self.scan_pdf(path) {
            Ok(result) if result.has_watermark => {
                info!(path = %path.display(), confidence = result.confidence, "PDF watermark detected");
                WatermarkVerdict::Watermarked(result)
            }
            Ok(_) => WatermarkVerdict::Clean,
            Err(e) => unknown(path, e),
        }
    }

    pub fn detect_office_watermark(&self, path: &Path) -> WatermarkVerdict {
        match self.scan_office(path) {
            Ok(Some(keyword)) => {
                info!(path = %path.display(), keyword = %keyword, "Office watermark detected");
                WatermarkVerdict::Watermarked(WatermarkDetectionResult {
                    has_watermark: true,
                    kind: Some(form_types::WatermarkKind::Text),
                    content: Some(keyword),
                    confidence: 1.0,
                    location: None,
                })
            }
            Ok(None) => WatermarkVerdict::Clean,
            Err(e) => unknown(path, e),
        }
    }

    /// Boolean view of the Office scan; errors read as "no watermark"
    pub fn has_office_watermark(&self, path: &Path) -> bool {
        self.detect_office_watermark(path).is_watermarked()
    }

    /// Dispatch on file extension
    pub fn detect_path(&self, path: &Path) -> WatermarkVerdict {
        match extension(path).as_str() {
            "pdf" => self.detect_pdf_watermark(path),
            "docx" | "xlsx" => self.detect_office_watermark(path),
            other => unknown(path, WatermarkError::UnsupportedFileType(other.to_string())),
        }
    }
}

fn unknown(path: &Path, error: WatermarkError) -> WatermarkVerdict {
    warn!(path = %path.display(), error = %error, "Watermark scan failed");
    WatermarkVerdict::Unknown {
        reason: error.to_string(),
    }
}

/// Lowercase extension without the dot, empty when absent
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}
