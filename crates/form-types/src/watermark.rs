//! Watermark scan results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    Text,
    Image,
}

/// Where a watermark was found. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatermarkLocation {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    /// Degrees
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkDetectionResult {
    pub has_watermark: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WatermarkKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<WatermarkLocation>,
}

impl WatermarkDetectionResult {
    pub fn none() -> Self {
        Self {
            has_watermark: false,
            kind: None,
            content: None,
            confidence: 0.0,
            location: None,
        }
    }
}

/// Outcome of a scan, keeping detector failures distinct from a clean document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WatermarkVerdict {
    Clean,
    Watermarked(WatermarkDetectionResult),
    Unknown { reason: String },
}

impl WatermarkVerdict {
    pub fn is_watermarked(&self) -> bool {
        matches!(self, WatermarkVerdict::Watermarked(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, WatermarkVerdict::Unknown { .. })
    }

    /// Collapse into a plain result, reading `Unknown` as clean
    pub fn into_detection_result(self) -> WatermarkDetectionResult {
        match self {
            WatermarkVerdict::Watermarked(result) => result,
            WatermarkVerdict::Clean | WatermarkVerdict::Unknown { .. } => {
                WatermarkDetectionResult::none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_shape() {
        let verdict = WatermarkVerdict::Watermarked(WatermarkDetectionResult {
            has_watermark: true,
            kind: Some(WatermarkKind::Text),
            content: Some("sample document".to_string()),
            confidence: 0.6,
            location: Some(WatermarkLocation {
                page: 1,
                x: 100.0,
                y: 400.0,
                rotation: 45.0,
            }),
        });
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "watermarked");
        assert_eq!(json["hasWatermark"], true);
        assert_eq!(json["type"], "text");

        let unknown = serde_json::to_value(WatermarkVerdict::Unknown {
            reason: "corrupt".to_string(),
        })
        .unwrap();
        assert_eq!(unknown["status"], "unknown");
        assert_eq!(unknown["reason"], "corrupt");
    }

    #[test]
    fn test_unknown_collapses_to_clean() {
        let verdict = WatermarkVerdict::Unknown {
            reason: "unreadable".to_string(),
        };
        assert!(verdict.is_unknown());
        assert!(!verdict.clone().into_detection_result().has_watermark);
    }
}
