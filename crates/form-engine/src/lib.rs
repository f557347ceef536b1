//! Field detection and form structuring
//!
//! Turns label/text candidates pulled out of a document into typed fields,
//! then groups those fields into ordered, leveled sections.
//!
//! # Example
//!
//! ```
//! use form_engine::{build_field, structure::{merge_sections, process_form_structure}};
//! use form_types::FieldType;
//!
//! let fields = vec![
//!     build_field("Employee Name*", "").with_section("Personal Info"),
//!     build_field("Start Date", "").with_section("Personal Info"),
//! ];
//! let sections = merge_sections(process_form_structure(fields));
//!
//! assert_eq!(sections.len(), 1);
//! assert_eq!(sections[0].leaf_fields()[1].field_type, FieldType::Date);
//! ```

pub mod confidence;
pub mod detection;
pub mod patterns;
pub mod structure;

pub use confidence::{field_confidence, mean_field_confidence, score_field};
pub use detection::{
    detect_field_type, detect_rating_scale, detect_validation_rules, normalize_label,
};
pub use structure::{
    detect_section_level, merge_sections, process_form_structure, validate_form_structure,
};

use form_types::{FieldType, FormField};

/// Run the full heuristic chain over one candidate.
///
/// The label is classified as written (an asterisk still marks it required) and
/// then stored trimmed of markers. Section membership is left to the caller;
/// call [`confidence::score_field`] once the section is known.
pub fn build_field(raw_label: &str, text: &str) -> FormField {
    let field_type = detect_field_type(raw_label, text);
    let validation = detect_validation_rules(raw_label, text);
    let label = normalize_label(raw_label);

    let mut field = FormField::new(label, field_type, validation);
    if field_type == FieldType::Rating {
        field.rating_scale = Some(detect_rating_scale(text));
    }
    confidence::score_field(&mut field);
    field
}
