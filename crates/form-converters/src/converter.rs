//! The converter contract shared by production code and the harness

use async_trait::async_trait;
use form_types::ConversionResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Scan for watermarks before converting
    #[serde(default = "default_true")]
    pub watermark_check: bool,
    /// Run the OCR pass where a converter has one
    #[serde(default = "default_true")]
    pub ocr_enabled: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            watermark_check: true,
            ocr_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A backend that turns one document into a form definition.
///
/// `convert` never fails past this boundary: errors come back as
/// [`ConversionResult::failure`].
#[async_trait]
pub trait Converter: Send + Sync {
    /// Stable name used in logs and harness reports
    fn name(&self) -> &'static str;

    /// Whether this converter handles the lowercase extension `file_type`
    fn supports(&self, file_type: &str) -> bool;

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult;

    /// Release pooled resources; converters without any keep the default
    async fn cleanup(&self) {}
}
