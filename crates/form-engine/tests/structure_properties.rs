//! Property tests for detection and structuring invariants

use form_engine::{
    build_field, detect_validation_rules, merge_sections, process_form_structure,
    validate_form_structure,
};
use form_types::{FormField, FormSection, ValidationKind};
use proptest::prelude::*;
use std::collections::BTreeMap;

const SECTION_TITLES: &[&str] = &[
    "Personal Info",
    "Employment",
    "# Overview",
    "## Contact details",
    "Part 2: References",
    "Questions about your previous employment and references",
];

fn arb_field() -> impl Strategy<Value = FormField> {
    (
        "[A-Za-z ]{1,20}\\*?",
        ".{0,40}",
        prop::option::of(prop::sample::select(SECTION_TITLES)),
    )
        .prop_map(|(label, text, section)| {
            let field = build_field(&label, &text);
            match section {
                Some(title) => field.with_section(title),
                None => field,
            }
        })
        .prop_filter("label must survive normalization", |f| !f.label.is_empty())
}

/// title -> number of leaf fields
fn shape(sections: &[FormSection]) -> BTreeMap<String, usize> {
    sections
        .iter()
        .map(|s| (s.title.clone(), s.leaf_fields().len()))
        .collect()
}

proptest! {
    #[test]
    fn required_matches_rule_presence(label in ".{0,30}", text in ".{0,60}") {
        let rules = detect_validation_rules(&label, &text);
        let field = FormField::new("x", form_types::FieldType::Input, rules.clone());
        prop_assert_eq!(
            field.required,
            rules.iter().any(|r| r.kind == ValidationKind::Required)
        );
    }

    #[test]
    fn merge_is_idempotent(fields in prop::collection::vec(arb_field(), 0..20)) {
        let once = merge_sections(process_form_structure(fields));
        let twice = merge_sections(once.clone());
        prop_assert_eq!(shape(&once), shape(&twice));
        prop_assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn merge_output_is_level_sorted(fields in prop::collection::vec(arb_field(), 0..20)) {
        let merged = merge_sections(process_form_structure(fields));
        prop_assert!(merged.windows(2).all(|w| w[0].level <= w[1].level));
    }

    #[test]
    fn merge_titles_are_unique(fields in prop::collection::vec(arb_field(), 0..20)) {
        let merged = merge_sections(process_form_structure(fields));
        let mut titles: Vec<_> = merged.iter().map(|s| s.title.clone()).collect();
        let before = titles.len();
        titles.sort();
        titles.dedup();
        prop_assert_eq!(before, titles.len());
    }

    #[test]
    fn structuring_preserves_every_field(fields in prop::collection::vec(arb_field(), 0..20)) {
        let count = fields.len();
        let sections = process_form_structure(fields);
        let total: usize = sections.iter().map(|s| s.leaf_fields().len()).sum();
        prop_assert_eq!(total, count);
    }

    #[test]
    fn generated_structures_validate(fields in prop::collection::vec(arb_field(), 0..20)) {
        let sections = process_form_structure(fields);
        prop_assert!(validate_form_structure(&sections));
        prop_assert!(validate_form_structure(&merge_sections(sections)));
    }

    #[test]
    fn field_confidence_stays_in_range(label in ".{0,30}", text in ".{0,120}") {
        let field = build_field(&label, &text);
        prop_assert!((0.5..=1.0).contains(&field.confidence));
    }
}

#[test]
fn same_title_fields_share_one_section() {
    let fields = vec![
        build_field("Full name", "").with_section("Personal Info"),
        build_field("Email", "").with_section("Personal Info"),
    ];
    let sections = merge_sections(process_form_structure(fields));

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Personal Info");
    let labels: Vec<_> = sections[0]
        .leaf_fields()
        .iter()
        .map(|f| f.label.clone())
        .collect();
    assert_eq!(labels, vec!["Full name", "Email"]);
}
