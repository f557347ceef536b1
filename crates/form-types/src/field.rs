//! Form fields and the metadata attached to them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of input a detected field renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Input,
    Checkbox,
    Radio,
    Textarea,
    Date,
    Select,
    Signature,
    Rating,
    Currency,
    Url,
    File,
    Color,
}

impl FieldType {
    pub const ALL: [FieldType; 12] = [
        FieldType::Input,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Textarea,
        FieldType::Date,
        FieldType::Select,
        FieldType::Signature,
        FieldType::Rating,
        FieldType::Currency,
        FieldType::Url,
        FieldType::File,
        FieldType::Color,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Input => "input",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Textarea => "textarea",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Signature => "signature",
            FieldType::Rating => "rating",
            FieldType::Currency => "currency",
            FieldType::Url => "url",
            FieldType::File => "file",
            FieldType::Color => "color",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Email,
    Phone,
    Number,
    Length,
    Pattern,
    Date,
    Required,
    Range,
    Url,
    Currency,
    Custom,
}

/// Optional parameters of a validation rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_validator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: ValidationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ValidationParams>,
}

impl ValidationRule {
    pub fn new(kind: ValidationKind) -> Self {
        Self { kind, params: None }
    }

    pub fn with_params(kind: ValidationKind, params: ValidationParams) -> Self {
        Self {
            kind,
            params: Some(params),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingStyle {
    #[default]
    Numeric,
    Stars,
    Emoji,
    Custom,
}

/// Scale of a rating field, e.g. 1 to 10 numeric or 5 stars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingScale {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    /// Anchor labels keyed by scale value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<i32, String>>,
    pub style: RatingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_icons: Option<Vec<String>>,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            min: 1,
            max: 5,
            step: 1,
            labels: None,
            style: RatingStyle::Numeric,
            custom_icons: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
}

/// Show/hide dependency on another field's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCondition {
    pub depends_on: String,
    pub value: serde_json::Value,
    pub operation: ConditionOperator,
}

/// Layout hints for renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Position of a detection on its page, in source units (points or pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A single detected form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    /// Cached projection of "a `required` rule is present"
    pub required: bool,
    #[serde(default)]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Title of the owning section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FieldCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_scale: Option<RatingScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<FieldStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Accessibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Extracted value or surrounding text, when the source provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl FormField {
    /// Create a field with a fresh id; `required` is derived from `validation`.
    pub fn new(
        label: impl Into<String>,
        field_type: FieldType,
        validation: Vec<ValidationRule>,
    ) -> Self {
        let required = validation.iter().any(|r| r.kind == ValidationKind::Required);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            field_type,
            label: label.into(),
            required,
            validation,
            options: Vec::new(),
            placeholder: None,
            section: None,
            conditions: Vec::new(),
            rating_scale: None,
            style: None,
            accessibility: None,
            bounds: None,
            value: None,
            confidence: 0.0,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_rating_scale(mut self, scale: RatingScale) -> Self {
        self.rating_scale = Some(scale);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn has_rule(&self, kind: ValidationKind) -> bool {
        self.validation.iter().any(|r| r.kind == kind)
    }

    /// True when the cached `required` flag agrees with the rule list
    pub fn required_is_consistent(&self) -> bool {
        self.required == self.has_rule(ValidationKind::Required)
    }
}
