//! Confidence model shared by every converter and the comparison harness
//!
//! A field starts at [`FIELD_BASE_CONFIDENCE`] and earns
//! [`FIELD_SIGNAL_BONUS`] for each piece of corroborating structure: at least
//! one validation rule, a type other than `input`, a rating scale, and a
//! section. A result's confidence is the mean over its fields.

use form_types::{FieldType, FormField};

pub const FIELD_BASE_CONFIDENCE: f64 = 0.5;

pub const FIELD_SIGNAL_BONUS: f64 = 0.1;

/// Best-ranked confidence below this earns a manual-review warning
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Weight of confidence in the harness's overall score; speed gets the rest
pub const CONFIDENCE_WEIGHT: f64 = 0.6;

pub const SPEED_WEIGHT: f64 = 0.4;

pub fn field_confidence(field: &FormField) -> f64 {
    let signals = [
        !field.validation.is_empty(),
        field.field_type != FieldType::Input,
        field.rating_scale.is_some(),
        field.section.is_some(),
    ];
    let bonus = signals.iter().filter(|s| **s).count() as f64 * FIELD_SIGNAL_BONUS;
    (FIELD_BASE_CONFIDENCE + bonus).min(1.0)
}

/// Store [`field_confidence`] on the field
pub fn score_field(field: &mut FormField) {
    field.confidence = field_confidence(field);
}

/// Mean stored confidence, 0 for an empty list
pub fn mean_field_confidence<'a, I>(fields: I) -> f64
where
    I: IntoIterator<Item = &'a FormField>,
{
    let (sum, count) = fields
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), f| (sum + f.confidence, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
