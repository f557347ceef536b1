//! Result scoring and converter recommendation
//!
//! A converter's score for one document is the mean, over its fields, of
//! four signals averaged together: the field has a label, the field has a
//! type, the field has a value, and the field's own confidence. Ranking
//! blends that score with speed relative to the slowest successful run.

use form_engine::confidence::{CONFIDENCE_WEIGHT, LOW_CONFIDENCE_THRESHOLD, SPEED_WEIGHT};
use form_types::{ConversionResult, FormField};
use serde::{Deserialize, Serialize};

use crate::runner::ConversionMetrics;

pub const NO_CONVERTER: &str = "none";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub best_overall: String,
    pub best_confidence: String,
    pub best_speed: String,
    pub recommendations: Vec<String>,
}

impl Analysis {
    fn all_failed() -> Self {
        Self {
            best_overall: NO_CONVERTER.to_string(),
            best_confidence: NO_CONVERTER.to_string(),
            best_speed: NO_CONVERTER.to_string(),
            recommendations: vec!["All converters failed".to_string()],
        }
    }

    pub fn has_low_confidence_warning(&self) -> bool {
        self.recommendations.iter().any(|r| r.starts_with("Warning:"))
    }
}

fn field_score(field: &FormField) -> f64 {
    let has_label = if field.label.is_empty() { 0.0 } else { 1.0 };
    // Every field carries a type
    let has_type = 1.0;
    let has_value = if field.value.is_some() { 1.0 } else { 0.0 };
    (has_label + has_type + has_value + field.confidence) / 4.0
}

/// Harness confidence for one result; zero for failures and empty results
pub fn score_result(result: &ConversionResult) -> f64 {
    if !result.success {
        return 0.0;
    }
    let fields = result.scored_fields();
    if fields.is_empty() {
        return 0.0;
    }
    fields.iter().map(|f| field_score(f)).sum::<f64>() / fields.len() as f64
}

/// `confidence * 0.6 + (1 - duration / slowest) * 0.4`
pub fn overall_score(metrics: &ConversionMetrics, slowest_ms: u64) -> f64 {
    let speed = if slowest_ms == 0 {
        1.0
    } else {
        1.0 - metrics.duration_ms as f64 / slowest_ms as f64
    };
    metrics.confidence * CONFIDENCE_WEIGHT + speed * SPEED_WEIGHT
}

/// Pick the best converters among the runs that did not fail. Ties go to
/// the converter listed first.
pub fn analyze_results(metrics: &[ConversionMetrics]) -> Analysis {
    let valid: Vec<&ConversionMetrics> = metrics.iter().filter(|m| m.error.is_none()).collect();
    let Some(&first) = valid.first() else {
        return Analysis::all_failed();
    };

    let best_confidence = valid.iter().skip(1).fold(first, |best, &m| {
        if m.confidence > best.confidence {
            m
        } else {
            best
        }
    });
    let best_speed = valid.iter().skip(1).fold(first, |best, &m| {
        if m.duration_ms < best.duration_ms {
            m
        } else {
            best
        }
    });

    let slowest = valid.iter().map(|m| m.duration_ms).max().unwrap_or(0);
    let best_overall = valid
        .iter()
        .skip(1)
        .fold((first, overall_score(first, slowest)), |(best, best_score), &m| {
            let score = overall_score(m, slowest);
            if score > best_score {
                (m, score)
            } else {
                (best, best_score)
            }
        })
        .0;

    let mut recommendations = vec![
        format!("Best overall converter: {}", best_overall.converter),
        format!(
            "Highest confidence: {} ({:.2})",
            best_confidence.converter, best_confidence.confidence
        ),
        format!(
            "Fastest conversion: {} ({}ms)",
            best_speed.converter, best_speed.duration_ms
        ),
    ];
    if best_confidence.confidence < LOW_CONFIDENCE_THRESHOLD {
        recommendations
            .push("Warning: Low confidence scores, manual verification recommended".to_string());
    }

    Analysis {
        best_overall: best_overall.converter.clone(),
        best_confidence: best_confidence.converter.clone(),
        best_speed: best_speed.converter.clone(),
        recommendations,
    }
}
