//! Converter configuration
//!
//! Built from environment variables (the binary preloads `.env`) or from a
//! TOML file. Cloud sections stay optional here; the cloud converters reject
//! incomplete settings when they are constructed.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watermark_detector::{WatermarkDetector, WatermarkPolicy, WatermarkRules};

use crate::error::ConverterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Base URL of the layout inference service
    #[serde(default = "default_inference_url")]
    pub inference_url: String,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Bound on every outbound HTTP call, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// LibreOffice binary used to normalize Office files to PDF
    #[serde(default = "default_soffice_bin")]
    pub soffice_bin: String,
    /// TOML file overriding the built-in watermark rules
    #[serde(default)]
    pub watermark_rules_path: Option<PathBuf>,
    #[serde(default)]
    pub watermark_policy: WatermarkPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_google_location")]
    pub location: String,
    #[serde(default = "default_google_processor")]
    pub processor_id: String,
    /// OAuth bearer token sent with each request
    #[serde(default)]
    pub access_token: Option<String>,
    /// Overrides `https://{location}-documentai.googleapis.com`
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_azure_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// tessdata directory; tesseract's own lookup when unset
    #[serde(default)]
    pub tessdata_dir: Option<String>,
    /// Directory holding the pdfium shared library; the working directory
    /// and then the system library path when unset
    #[serde(default)]
    pub pdfium_library_dir: Option<PathBuf>,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    /// Render resolution for the OCR pass
    #[serde(default = "default_ocr_dpi")]
    pub dpi: u32,
    /// Words below this engine confidence (0 to 100) are dropped
    #[serde(default = "default_ocr_min_confidence")]
    pub min_confidence: i32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            inference_url: default_inference_url(),
            google: GoogleConfig::default(),
            azure: AzureConfig::default(),
            ocr: OcrConfig::default(),
            http_timeout_secs: default_http_timeout_secs(),
            soffice_bin: default_soffice_bin(),
            watermark_rules_path: None,
            watermark_policy: WatermarkPolicy::default(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: default_google_location(),
            processor_id: default_google_processor(),
            access_token: None,
            endpoint: None,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            poll_interval_ms: default_azure_poll_interval_ms(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            pdfium_library_dir: None,
            language: default_ocr_language(),
            dpi: default_ocr_dpi(),
            min_confidence: default_ocr_min_confidence(),
        }
    }
}

impl ConverterConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    pub fn from_env() -> Result<Self, ConverterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConverterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let http_timeout_secs = match get("CONVERTER_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ConverterError::Config(format!("Invalid CONVERTER_HTTP_TIMEOUT_SECS: {}", raw))
            })?,
            None => defaults.http_timeout_secs,
        };
        let watermark_policy = match get("WATERMARK_POLICY") {
            Some(raw) => WatermarkPolicy::parse(&raw).ok_or_else(|| {
                ConverterError::Config(format!(
                    "Invalid WATERMARK_POLICY: {} (expected fail-open or fail-closed)",
                    raw
                ))
            })?,
            None => defaults.watermark_policy,
        };

        Ok(Self {
            inference_url: get("INFERENCE_SERVICE_URL").unwrap_or(defaults.inference_url),
            google: GoogleConfig {
                project_id: get("GOOGLE_CLOUD_PROJECT_ID"),
                location: get("GOOGLE_CLOUD_LOCATION").unwrap_or(defaults.google.location),
                processor_id: get("GOOGLE_CLOUD_PROCESSOR_ID")
                    .unwrap_or(defaults.google.processor_id),
                access_token: get("GOOGLE_CLOUD_ACCESS_TOKEN"),
                endpoint: get("GOOGLE_DOCUMENT_AI_ENDPOINT"),
            },
            azure: AzureConfig {
                endpoint: get("AZURE_FORM_RECOGNIZER_ENDPOINT"),
                key: get("AZURE_FORM_RECOGNIZER_KEY"),
                poll_interval_ms: defaults.azure.poll_interval_ms,
            },
            ocr: OcrConfig {
                tessdata_dir: get("OCR_TESSDATA_DIR"),
                pdfium_library_dir: get("PDFIUM_LIBRARY_DIR").map(PathBuf::from),
                language: get("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                dpi: defaults.ocr.dpi,
                min_confidence: defaults.ocr.min_confidence,
            },
            http_timeout_secs,
            soffice_bin: get("SOFFICE_BIN").unwrap_or(defaults.soffice_bin),
            watermark_rules_path: get(watermark_detector::rules::RULES_PATH_ENV).map(PathBuf::from),
            watermark_policy,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Shared client with the configured timeout
    pub fn http_client(&self) -> Result<reqwest::Client, ConverterError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout())
            .build()
            .map_err(|e| ConverterError::Config(format!("Failed to create HTTP client: {}", e)))
    }

    pub fn watermark_detector(&self) -> Result<WatermarkDetector, ConverterError> {
        let rules = match &self.watermark_rules_path {
            Some(path) => WatermarkRules::from_file(path)?,
            None => WatermarkRules::default(),
        };
        Ok(WatermarkDetector::new(rules)?)
    }

    pub fn google_configured(&self) -> bool {
        self.google.project_id.is_some()
    }

    pub fn azure_configured(&self) -> bool {
        self.azure.endpoint.is_some() && self.azure.key.is_some()
    }
}

impl GoogleConfig {
    /// `projects/{id}/locations/{location}/processors/{processor}`
    pub fn processor_name(&self) -> Result<String, ConverterError> {
        let project = self.project_id.as_deref().ok_or_else(|| {
            ConverterError::Config("Google Cloud Project ID not configured".to_string())
        })?;
        Ok(format!(
            "projects/{}/locations/{}/processors/{}",
            project, self.location, self.processor_id
        ))
    }

    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-documentai.googleapis.com", self.location),
        }
    }
}

fn default_inference_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_google_location() -> String {
    "us".to_string()
}

fn default_google_processor() -> String {
    "form-parser-latest".to_string()
}

fn default_azure_poll_interval_ms() -> u64 {
    1000
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_ocr_dpi() -> u32 {
    150
}

fn default_ocr_min_confidence() -> i32 {
    50
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_soffice_bin() -> String {
    "soffice".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = ConverterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ConverterConfig::default());
        assert_eq!(config.inference_url, "http://localhost:8000");
        assert_eq!(config.http_timeout(), Duration::from_secs(60));
        assert!(!config.google_configured());
        assert!(!config.azure_configured());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ConverterConfig::from_lookup(lookup(&[
            ("INFERENCE_SERVICE_URL", "http://inference:9000"),
            ("GOOGLE_CLOUD_PROJECT_ID", "forms-prod"),
            ("GOOGLE_CLOUD_LOCATION", "eu"),
            ("AZURE_FORM_RECOGNIZER_ENDPOINT", "https://forms.cognitiveservices.azure.com"),
            ("AZURE_FORM_RECOGNIZER_KEY", "secret"),
            ("CONVERTER_HTTP_TIMEOUT_SECS", "15"),
            ("WATERMARK_POLICY", "fail-closed"),
            ("PDFIUM_LIBRARY_DIR", "/opt/pdfium/lib"),
        ]))
        .unwrap();

        assert_eq!(config.inference_url, "http://inference:9000");
        assert_eq!(
            config.google.processor_name().unwrap(),
            "projects/forms-prod/locations/eu/processors/form-parser-latest"
        );
        assert_eq!(config.google.endpoint(), "https://eu-documentai.googleapis.com");
        assert!(config.azure_configured());
        assert_eq!(config.http_timeout_secs, 15);
        assert_eq!(config.watermark_policy, WatermarkPolicy::FailClosed);
        assert_eq!(config.ocr.pdfium_library_dir, Some(PathBuf::from("/opt/pdfium/lib")));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config =
            ConverterConfig::from_lookup(lookup(&[("GOOGLE_CLOUD_PROJECT_ID", "   ")])).unwrap();
        assert!(config.google.project_id.is_none());
        let err = config.google.processor_name().unwrap_err();
        assert_eq!(err.to_string(), "Google Cloud Project ID not configured");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ConverterConfig::from_lookup(lookup(&[("CONVERTER_HTTP_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ConverterConfig::from_lookup(lookup(&[("CONVERTER_HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert!(ConverterConfig::from_lookup(lookup(&[("WATERMARK_POLICY", "strict")])).is_err());
    }

    #[test]
    fn test_toml_config() {
        let config = ConverterConfig::from_str(
            r#"
inference_url = "http://10.0.0.5:8000"
http_timeout_secs = 30
watermark_policy = "fail-closed"

[google]
project_id = "forms-dev"
endpoint = "http://localhost:9999/"

[ocr]
language = "eng+fra"
"#,
        )
        .unwrap();

        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.google.location, "us");
        assert_eq!(config.google.endpoint(), "http://localhost:9999");
        assert_eq!(config.ocr.language, "eng+fra");
        assert_eq!(config.ocr.min_confidence, 50);
        assert!(config.ocr.tessdata_dir.is_none());
        assert_eq!(config.watermark_policy, WatermarkPolicy::FailClosed);
    }
}
