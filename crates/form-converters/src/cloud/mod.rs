//! Cloud document-understanding backends
//!
//! Both services return key/value pairs without semantic types, so field
//! types are refined from the shape of the extracted value.

pub mod azure;
pub mod document_ai;

pub use azure::AzureConverter;
pub use document_ai::DocumentAiConverter;

use form_types::{Bounds, FieldType, FormField, ValidationKind, ValidationRule};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_VALUE: Regex = Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").unwrap();
    static ref INTEGER_VALUE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref EMAIL_VALUE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref BOOLEAN_VALUE: Regex = Regex::new(r"(?i)^(true|false|yes|no)$").unwrap();
}

/// Adjust a field built from its label using the shape of its value, then
/// rescore it
pub fn refine_by_value(field: &mut FormField) {
    let Some(value) = field.value.as_deref().map(str::trim) else {
        return;
    };

    if DATE_VALUE.is_match(value) {
        field.field_type = FieldType::Date;
    } else if BOOLEAN_VALUE.is_match(value) {
        field.field_type = FieldType::Checkbox;
    } else if INTEGER_VALUE.is_match(value) {
        add_rule(field, ValidationKind::Number);
    } else if EMAIL_VALUE.is_match(value) {
        add_rule(field, ValidationKind::Email);
    }
    form_engine::score_field(field);
}

fn add_rule(field: &mut FormField, kind: ValidationKind) {
    if !field.has_rule(kind) {
        field.validation.push(ValidationRule::new(kind));
    }
}

/// Axis-aligned box around a polygon given as (x, y) points
pub fn polygon_bounds<I>(points: I) -> Option<Bounds>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut iter = points.into_iter();
    let (x0, y0) = iter.next()?;
    let (min_x, min_y, max_x, max_y) = iter.fold((x0, y0, x0, y0), |(a, b, c, d), (x, y)| {
        (a.min(x), b.min(y), c.max(x), d.max(y))
    });
    Some(Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}
