//! Label/text heuristics for field type, validation rules and rating scales
//!
//! These never fail. A candidate that matches nothing is an `input` with no
//! rules, and a rating prompt without a recognizable range gets a 1 to 5
//! numeric scale.

use std::collections::BTreeMap;

use form_types::{
    FieldType, RatingScale, RatingStyle, ValidationKind, ValidationParams, ValidationRule,
};

use crate::patterns::*;

/// Classify a candidate. The first matching category wins.
pub fn detect_field_type(label: &str, text: &str) -> FieldType {
    let label_lower = label.to_lowercase();
    let text_lower = text.to_lowercase();

    if contains_any(&label_lower, RATING_KEYWORDS)
        || text_lower.contains("scale of")
        || RATE_PATTERN.is_match(&text_lower)
    {
        return FieldType::Rating;
    }

    if contains_any(&label_lower, DATE_KEYWORDS) || DATE_TEXT_PATTERN.is_match(text) {
        return FieldType::Date;
    }

    if contains_any(&label_lower, FILE_KEYWORDS) {
        return FieldType::File;
    }

    if contains_any(&label_lower, CURRENCY_KEYWORDS) || CURRENCY_GLYPH_PATTERN.is_match(text) {
        return FieldType::Currency;
    }

    if contains_any(&label_lower, URL_KEYWORDS) || URL_TEXT_PATTERN.is_match(text) {
        return FieldType::Url;
    }

    if contains_any(&label_lower, TEXTAREA_KEYWORDS)
        || text.chars().count() > TEXTAREA_MIN_TEXT_LEN
    {
        return FieldType::Textarea;
    }

    if contains_any(&label_lower, SIGNATURE_KEYWORDS) {
        return FieldType::Signature;
    }

    if contains_any(&label_lower, COLOR_KEYWORDS) {
        return FieldType::Color;
    }

    FieldType::Input
}

/// Collect every rule the candidate suggests. Rules are independent of each
/// other and of the detected type.
pub fn detect_validation_rules(label: &str, text: &str) -> Vec<ValidationRule> {
    let mut rules = Vec::new();
    let label_lower = label.to_lowercase();

    if label_lower.contains('*') || label_lower.contains("required") || text.contains("*required")
    {
        rules.push(ValidationRule::new(ValidationKind::Required));
    }

    if contains_any(&label_lower, EMAIL_KEYWORDS) || text.contains('@') {
        rules.push(ValidationRule::new(ValidationKind::Email));
    }

    if contains_any(&label_lower, PHONE_KEYWORDS) || PHONE_TEXT_PATTERN.is_match(text) {
        rules.push(ValidationRule::new(ValidationKind::Phone));
    }

    if contains_any(&label_lower, NUMBER_KEYWORDS) || DIGITS_ONLY_PATTERN.is_match(text) {
        rules.push(ValidationRule::new(ValidationKind::Number));
    }

    if contains_any(&label_lower, URL_KEYWORDS) {
        rules.push(ValidationRule::new(ValidationKind::Url));
    }

    if contains_any(&label_lower, MONEY_RULE_KEYWORDS) {
        rules.push(ValidationRule::with_params(
            ValidationKind::Currency,
            ValidationParams {
                currency: Some("USD".to_string()),
                min: Some(0.0),
                ..Default::default()
            },
        ));
    }

    if contains_any(&label_lower, BRIEF_KEYWORDS) {
        rules.push(ValidationRule::with_params(
            ValidationKind::Length,
            ValidationParams {
                max: Some(200.0),
                message: Some("Please keep your response brief (max 200 characters)".to_string()),
                ..Default::default()
            },
        ));
    } else if contains_any(&label_lower, DETAILED_KEYWORDS) {
        rules.push(ValidationRule::with_params(
            ValidationKind::Length,
            ValidationParams {
                min: Some(50.0),
                max: Some(1000.0),
                message: Some("Please provide a detailed response (50-1000 characters)".to_string()),
                ..Default::default()
            },
        ));
    }

    if label_lower.contains("employee id") {
        rules.push(ValidationRule::with_params(
            ValidationKind::Pattern,
            ValidationParams {
                pattern: Some(EMPLOYEE_ID_PATTERN.to_string()),
                message: Some("Employee ID must be 2 letters followed by 6 numbers".to_string()),
                ..Default::default()
            },
        ));
    }

    rules
}

/// Read a rating scale out of the prompt text.
///
/// Tries "N to M", then "N-M", then "N stars", then emoji wording. Falls back
/// to [`RatingScale::default`].
pub fn detect_rating_scale(text: &str) -> RatingScale {
    let range = SCALE_TO_PATTERN
        .captures(text)
        .or_else(|| SCALE_RANGE_PATTERN.captures(text))
        .and_then(|caps| Some((caps[1].parse::<i32>().ok()?, caps[2].parse::<i32>().ok()?)));

    if let Some((min, max)) = range {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        return RatingScale {
            min,
            max,
            step: 1,
            labels: anchor_labels(text, min, max),
            style: RatingStyle::Numeric,
            custom_icons: None,
        };
    }

    if let Some(max) = SCALE_STARS_PATTERN
        .captures(text)
        .and_then(|caps| caps[1].parse::<i32>().ok())
    {
        return RatingScale {
            min: 0,
            max,
            step: 1,
            labels: None,
            style: RatingStyle::Stars,
            custom_icons: None,
        };
    }

    if text.to_lowercase().contains("emoji") || EMOJI_SCALE.iter().any(|e| text.contains(e)) {
        let labels = EMOJI_SCALE
            .iter()
            .enumerate()
            .map(|(i, e)| (i as i32 + 1, e.to_string()))
            .collect();
        return RatingScale {
            min: 1,
            max: 5,
            step: 1,
            labels: Some(labels),
            style: RatingStyle::Emoji,
            custom_icons: None,
        };
    }

    RatingScale::default()
}

/// Poor/Excellent or Disagree/Agree anchors when the prompt uses that wording
fn anchor_labels(text: &str, min: i32, max: i32) -> Option<BTreeMap<i32, String>> {
    let lower = text.to_lowercase();
    let span = i64::from(max) - i64::from(min);
    let at = |fraction: i64, parts: i64| (i64::from(min) + fraction * span / parts) as i32;
    let mut labels = BTreeMap::new();

    if lower.contains("poor") && lower.contains("excellent") {
        labels.insert(min, "Poor".to_string());
        labels.insert(at(1, 2), "Average".to_string());
        labels.insert(max, "Excellent".to_string());
    } else if lower.contains("disagree") && lower.contains("agree") {
        labels.insert(min, "Strongly Disagree".to_string());
        labels.insert(at(1, 4), "Disagree".to_string());
        labels.insert(at(1, 2), "Neutral".to_string());
        labels.insert(at(3, 4), "Agree".to_string());
        labels.insert(max, "Strongly Agree".to_string());
    } else {
        return None;
    }

    Some(labels)
}

/// Display form of a raw label: whitespace, trailing colons and asterisks removed
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
        .trim_start_matches('*')
        .trim()
        .to_string()
}
