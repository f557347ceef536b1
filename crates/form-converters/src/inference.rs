//! Layout inference service converter
//!
//! Posts the document to `{INFERENCE_SERVICE_URL}/predict` and reads back
//! tagged text entries. `header` entries open a section, `answer` entries
//! attach to the preceding field, everything else becomes a field candidate.

use async_trait::async_trait;
use form_types::{Bounds, ConversionResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::config::ConverterConfig;
use crate::converter::{ConversionOptions, Converter};
use crate::error::{ensure_success, ConverterError};
use crate::gate::WatermarkGate;
use crate::pipeline::{assemble, Candidate};

const SERVICE: &str = "inference";

const SUPPORTED: &[&str] = &["pdf", "xlsx", "png", "jpg", "jpeg"];

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    fields: Vec<PredictedEntry>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct PredictedEntry {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    bbox: Option<Bounds>,
}

impl PredictedEntry {
    fn label(&self) -> Option<&str> {
        self.label.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

pub struct InferenceConverter {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    gate: Option<WatermarkGate>,
}

impl InferenceConverter {
    pub fn new(config: &ConverterConfig, gate: Option<WatermarkGate>) -> Result<Self, ConverterError> {
        Ok(Self {
            base_url: config.inference_url.trim_end_matches('/').to_string(),
            client: config.http_client()?,
            timeout_secs: config.http_timeout_secs,
            gate,
        })
    }

    #[instrument(skip(self, options), fields(converter = SERVICE))]
    async fn run(&self, path: &Path, options: &ConversionOptions) -> Result<ConversionResult, ConverterError> {
        if options.watermark_check {
            if let Some(gate) = &self.gate {
                gate.check(path).await?;
            }
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type(path))
            .map_err(|e| ConverterError::backend(SERVICE, e.to_string()))?;

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| ConverterError::from_http(SERVICE, self.timeout_secs, e))?;

        let response = ensure_success(SERVICE, response).await?;

        let prediction: PredictResponse = response
            .json()
            .await
            .map_err(|e| ConverterError::from_http(SERVICE, self.timeout_secs, e))?;
        if !prediction.success {
            return Err(ConverterError::backend(SERVICE, "service reported failure"));
        }
        info!(
            model = prediction.model.as_deref().unwrap_or("unknown"),
            entries = prediction.fields.len(),
            "Inference response received"
        );

        let text = prediction
            .fields
            .iter()
            .filter_map(|e| e.text())
            .collect::<Vec<_>>()
            .join(" ");
        assemble(text, candidates(prediction.fields))
    }
}

/// Fold tagged entries into candidates in document order
fn candidates(entries: Vec<PredictedEntry>) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    let mut section: Option<String> = None;

    for entry in entries {
        if entry.label().is_none() && entry.text().is_none() {
            continue;
        }
        let kind = entry.kind.as_deref().unwrap_or("").to_ascii_lowercase();

        match kind.as_str() {
            "header" => {
                section = entry.label().or(entry.text()).map(str::to_string);
            }
            "answer" if !out.is_empty() => {
                let answer = entry.text().or(entry.label()).unwrap_or_default();
                if let Some(last) = out.last_mut() {
                    let value = match last.value.take() {
                        Some(existing) => format!("{} {}", existing, answer),
                        None => answer.to_string(),
                    };
                    last.value = Some(value);
                }
            }
            _ => {
                let (label, value) = match (entry.label(), entry.text()) {
                    (Some(label), text) => (label.to_string(), text.map(str::to_string)),
                    (None, Some(text)) => (text.to_string(), None),
                    (None, None) => continue,
                };
                let mut candidate = Candidate::new(label)
                    .with_section(section.clone())
                    .with_bounds(entry.bbox);
                if let Some(value) = value {
                    candidate = candidate.with_value(value);
                }
                out.push(candidate);
            }
        }
    }
    out
}

fn content_type(path: &Path) -> &'static str {
    match watermark_detector::extension(path).as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Converter for InferenceConverter {
    fn name(&self) -> &'static str {
        "InferenceConverter"
    }

    fn supports(&self, file_type: &str) -> bool {
        SUPPORTED.contains(&file_type)
    }

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        match self.run(path, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Inference conversion failed");
                ConversionResult::failure(e.to_string())
            }
        }
    }
}
