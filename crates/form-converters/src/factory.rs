//! Converter registry
//!
//! Built once at startup and passed to callers. Lookup is by lowercase file
//! extension; the first registered converter that supports it wins.

use form_types::ConversionResult;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cloud::{AzureConverter, DocumentAiConverter};
use crate::config::ConverterConfig;
use crate::converter::{ConversionOptions, Converter};
use crate::error::ConverterError;
use crate::gate::WatermarkGate;
use crate::inference::InferenceConverter;
use crate::ocr::OcrConverter;
use crate::office::OfficeConverter;

#[derive(Default, Clone)]
pub struct ConverterFactory {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Office, inference and OCR always; the cloud backends when configured
    pub fn with_defaults(config: &ConverterConfig, gate: Option<WatermarkGate>) -> Result<Self, ConverterError> {
        let mut factory = Self::new();
        factory.register(Arc::new(OfficeConverter::new(gate.clone())));
        factory.register(Arc::new(InferenceConverter::new(config, gate.clone())?));
        factory.register(Arc::new(OcrConverter::new(
            config.ocr.clone(),
            config.http_timeout(),
            gate.clone(),
        )));
        if config.google_configured() {
            factory.register(Arc::new(DocumentAiConverter::new(config, gate.clone())?));
        }
        if config.azure_configured() {
            factory.register(Arc::new(AzureConverter::new(config, gate)?));
        }
        info!(converters = ?factory.names(), "Converter registry ready");
        Ok(factory)
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    pub fn get_converter(&self, file_type: &str) -> Option<Arc<dyn Converter>> {
        let file_type = file_type.to_ascii_lowercase();
        self.converters
            .iter()
            .find(|c| c.supports(&file_type))
            .cloned()
    }

    /// Every converter that handles `file_type`, in registration order
    pub fn converters_for(&self, file_type: &str) -> Vec<Arc<dyn Converter>> {
        let file_type = file_type.to_ascii_lowercase();
        self.converters
            .iter()
            .filter(|c| c.supports(&file_type))
            .cloned()
            .collect()
    }

    /// Convert with the first matching converter. Never panics or errors:
    /// a missing converter or a panicking one comes back as a failure.
    pub async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        let ext = watermark_detector::extension(path);
        let Some(converter) = self.get_converter(&ext) else {
            warn!(path = %path.display(), "No converter for file type");
            return ConversionResult::failure(format!("No converter available for file type: {}", ext));
        };

        info!(path = %path.display(), converter = converter.name(), "Converting");
        match AssertUnwindSafe(converter.convert(path, options)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(converter = converter.name(), message = %message, "Converter panicked");
                ConversionResult::failure(format!("Conversion failed: {}", message))
            }
        }
    }

    /// Release every converter's pooled resources
    pub async fn cleanup(&self) {
        join_all(self.converters.iter().map(|c| c.cleanup())).await;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "converter panicked".to_string()
    }
}
