//! Watermark gate run ahead of conversion

use std::path::Path;
use tracing::{info, warn};
use watermark_detector::{WatermarkDetector, WatermarkPolicy, WatermarkVerdict};

use crate::error::ConverterError;

const SCANNABLE: &[&str] = &["pdf", "docx", "xlsx"];

/// Detector plus the policy that decides what a verdict means
#[derive(Debug, Clone)]
pub struct WatermarkGate {
    detector: WatermarkDetector,
    policy: WatermarkPolicy,
}

impl WatermarkGate {
    pub fn new(detector: WatermarkDetector, policy: WatermarkPolicy) -> Self {
        Self { detector, policy }
    }

    pub fn detector(&self) -> &WatermarkDetector {
        &self.detector
    }

    pub fn policy(&self) -> WatermarkPolicy {
        self.policy
    }

    /// Scan off the async runtime; join failures read as `Unknown`
    pub async fn verdict(&self, path: &Path) -> WatermarkVerdict {
        let detector = self.detector.clone();
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || detector.detect_path(&owned)).await {
            Ok(verdict) => verdict,
            Err(e) => WatermarkVerdict::Unknown {
                reason: format!("watermark scan aborted: {}", e),
            },
        }
    }

    /// An error when the policy rejects the document. Formats the
    /// detector cannot read (images) pass unchecked.
    pub async fn check(&self, path: &Path) -> Result<(), ConverterError> {
        if !SCANNABLE.contains(&watermark_detector::extension(path).as_str()) {
            return Ok(());
        }
        self.enforce(path, self.verdict(path).await)
    }

    /// Apply the policy to a verdict already in hand
    pub fn enforce(&self, path: &Path, verdict: WatermarkVerdict) -> Result<(), ConverterError> {
        if let WatermarkVerdict::Unknown { reason } = &verdict {
            warn!(path = %path.display(), policy = ?self.policy, reason = %reason, "Watermark status unknown");
        }
        if !self.policy.rejects(&verdict) {
            return Ok(());
        }
        info!(path = %path.display(), "Rejecting document");
        match verdict {
            WatermarkVerdict::Unknown { reason } => Err(ConverterError::WatermarkUnknown(reason)),
            _ => Err(ConverterError::Watermarked),
        }
    }
}
