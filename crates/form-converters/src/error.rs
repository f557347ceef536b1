//! Converter error type
//!
//! Errors stop at the converter boundary: every [`crate::Converter`] folds them
//! into a failed [`form_types::ConversionResult`] carrying the message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("{0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid PDF: {0}")]
    Pdf(String),

    #[error("Invalid office document: {0}")]
    Office(String),

    #[error("{service} error: {message}")]
    Backend { service: String, message: String },

    #[error("{service} request timed out after {seconds}s")]
    Timeout { service: String, seconds: u64 },

    #[error("Document contains watermark")]
    Watermarked,

    /// The scan could not finish and the policy is fail-closed
    #[error("Watermark check failed: {0}")]
    WatermarkUnknown(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("No form fields detected")]
    NoFields,
}

impl ConverterError {
    pub fn backend(service: &str, message: impl Into<String>) -> Self {
        ConverterError::Backend {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn tool(tool: &str, message: impl Into<String>) -> Self {
        ConverterError::Tool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Map a transport error, keeping timeouts distinguishable
    pub(crate) fn from_http(service: &str, timeout_secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConverterError::Timeout {
                service: service.to_string(),
                seconds: timeout_secs,
            }
        } else {
            ConverterError::backend(service, e.to_string())
        }
    }
}

/// Pass a 2xx response through; anything else becomes a backend error
/// carrying the status and body
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ConverterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ConverterError::backend(
        service,
        format!("HTTP {}: {}", status, body.trim()),
    ))
}

impl From<lopdf::Error> for ConverterError {
    fn from(e: lopdf::Error) -> Self {
        ConverterError::Pdf(e.to_string())
    }
}

impl From<zip::result::ZipError> for ConverterError {
    fn from(e: zip::result::ZipError) -> Self {
        ConverterError::Office(e.to_string())
    }
}

impl From<watermark_detector::WatermarkError> for ConverterError {
    fn from(e: watermark_detector::WatermarkError) -> Self {
        ConverterError::Config(e.to_string())
    }
}
