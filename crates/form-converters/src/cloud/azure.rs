//! Azure Form Recognizer (prebuilt-document model)
//!
//! Analysis is asynchronous: the POST returns `202 Accepted` with an
//! `Operation-Location` header, which is polled until the operation settles.
//! Polling is bounded by the configured HTTP timeout.

use async_trait::async_trait;
use form_types::{ConversionContent, ConversionResult, FormField};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{polygon_bounds, refine_by_value};
use crate::config::ConverterConfig;
use crate::converter::{ConversionOptions, Converter};
use crate::error::{ensure_success, ConverterError};
use crate::gate::WatermarkGate;
use crate::pipeline::{assemble_fields, Candidate};

const SERVICE: &str = "Azure Form Recognizer";

const API_VERSION: &str = "2023-07-31";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
    #[serde(default)]
    key_value_pairs: Vec<KeyValuePair>,
}

#[derive(Debug, Deserialize)]
struct KeyValuePair {
    key: DocumentElement,
    #[serde(default)]
    value: Option<DocumentElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentElement {
    #[serde(default)]
    content: String,
    #[serde(default)]
    bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Deserialize)]
struct BoundingRegion {
    /// Flat x0, y0, x1, y1, ... in inches
    #[serde(default)]
    polygon: Vec<f64>,
}

pub struct AzureConverter {
    endpoint: String,
    key: String,
    client: reqwest::Client,
    timeout: Duration,
    poll_interval: Duration,
    gate: Option<WatermarkGate>,
}

impl AzureConverter {
    /// Fails unless both endpoint and key are configured
    pub fn new(config: &ConverterConfig, gate: Option<WatermarkGate>) -> Result<Self, ConverterError> {
        let (endpoint, key) = match (&config.azure.endpoint, &config.azure.key) {
            (Some(endpoint), Some(key)) => (endpoint, key),
            _ => {
                return Err(ConverterError::Config(
                    "Azure Form Recognizer credentials not configured".to_string(),
                ))
            }
        };
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.clone(),
            client: config.http_client()?,
            timeout: config.http_timeout(),
            poll_interval: Duration::from_millis(config.azure.poll_interval_ms),
            gate,
        })
    }

    fn http_error(&self, e: reqwest::Error) -> ConverterError {
        ConverterError::from_http(SERVICE, self.timeout.as_secs(), e)
    }

    #[instrument(skip(self, options), fields(converter = "azure"))]
    async fn run(&self, path: &Path, options: &ConversionOptions) -> Result<ConversionResult, ConverterError> {
        if options.watermark_check {
            if let Some(gate) = &self.gate {
                gate.check(path).await?;
            }
        }

        let bytes = tokio::fs::read(path).await?;
        let operation = self.submit(bytes).await?;
        let result = self.poll(&operation).await?;

        let fields = form_fields(&result);
        if fields.is_empty() {
            return Err(ConverterError::NoFields);
        }
        info!(fields = fields.len(), "Azure fields mapped");
        let content = ConversionContent::Document {
            text: result.content,
            fields: fields.clone(),
        };
        Ok(assemble_fields(content, fields))
    }

    /// Start the analysis and return the operation URL
    async fn submit(&self, pdf: Vec<u8>) -> Result<String, ConverterError> {
        let url = format!(
            "{}/formrecognizer/documentModels/prebuilt-document:analyze?api-version={}",
            self.endpoint, API_VERSION
        );
        let response = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/pdf")
            .body(pdf)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        ensure_success(SERVICE, response)
            .await?
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ConverterError::backend(SERVICE, "missing Operation-Location header"))
    }

    async fn poll(&self, operation: &str) -> Result<AnalyzeResult, ConverterError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let response = self
                .client
                .get(operation)
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
                .send()
                .await
                .map_err(|e| self.http_error(e))?;
            let response = ensure_success(SERVICE, response).await?;

            let op: AnalyzeOperation = response.json().await.map_err(|e| self.http_error(e))?;
            debug!(status = %op.status, "Polled analysis");
            match op.status.as_str() {
                "succeeded" => return Ok(op.analyze_result.unwrap_or_default()),
                "failed" => {
                    let message = op
                        .error
                        .map(|e| e.message)
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "analysis failed".to_string());
                    return Err(ConverterError::backend(SERVICE, message));
                }
                _ => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ConverterError::Timeout {
                    service: SERVICE.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn form_fields(result: &AnalyzeResult) -> Vec<FormField> {
    result
        .key_value_pairs
        .iter()
        .filter_map(|pair| {
            let label = pair.key.content.trim();
            if label.is_empty() {
                return None;
            }
            let bounds = pair.key.bounding_regions.first().and_then(|region| {
                polygon_bounds(region.polygon.chunks_exact(2).map(|xy| (xy[0], xy[1])))
            });
            let mut candidate = Candidate::new(label).with_bounds(bounds);
            if let Some(value) = &pair.value {
                candidate = candidate.with_value(value.content.as_str());
            }
            let mut field = candidate.into_field();
            if field.label.is_empty() {
                return None;
            }
            refine_by_value(&mut field);
            Some(field)
        })
        .collect()
}

#[async_trait]
impl Converter for AzureConverter {
    fn name(&self) -> &'static str {
        "AzureConverter"
    }

    fn supports(&self, file_type: &str) -> bool {
        file_type == "pdf"
    }

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        match self.run(path, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Azure conversion failed");
                ConversionResult::failure(e.to_string())
            }
        }
    }
}
