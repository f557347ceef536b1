//! Grouping flat field lists into leveled sections

use std::collections::HashMap;

use form_types::{FormField, FormNode, FormSection};
use tracing::debug;

use crate::patterns::HEADING_PREFIX_PATTERN;

/// Title given to the one-field section wrapping an unsectioned field
pub const DEFAULT_SECTION_TITLE: &str = "Default Section";

/// Group fields into sections, preserving document order.
///
/// Consecutive fields sharing a section title share a section. A field with no
/// section closes whatever section is open and is emitted on its own under
/// [`DEFAULT_SECTION_TITLE`] at level 0.
pub fn process_form_structure(fields: Vec<FormField>) -> Vec<FormSection> {
    let mut sections = Vec::new();
    let mut current: Option<FormSection> = None;

    for field in fields {
        let title = field
            .section
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match title {
            None => {
                if let Some(open) = current.take() {
                    sections.push(open);
                }
                let mut section = FormSection::new(DEFAULT_SECTION_TITLE, 0);
                section.push(field);
                sections.push(section);
            }
            Some(title) => match current.as_mut() {
                Some(open) if open.title == title => open.push(field),
                _ => {
                    if let Some(open) = current.take() {
                        sections.push(open);
                    }
                    let mut section = FormSection::new(title.clone(), detect_section_level(&title));
                    section.push(field);
                    current = Some(section);
                }
            },
        }
    }

    if let Some(open) = current {
        sections.push(open);
    }

    debug!(sections = sections.len(), "Grouped fields into sections");
    sections
}

/// Nesting level implied by a heading's text.
///
/// Markdown prefixes map `#`..`####` to 0..3. Otherwise: two words or fewer is
/// a main heading (0), a colon marks a subsection (1), over 50 characters is a
/// deep subsection (2), and anything else defaults to 1.
pub fn detect_section_level(title: &str) -> u32 {
    if let Some(caps) = HEADING_PREFIX_PATTERN.captures(title) {
        return caps[1].len() as u32 - 1;
    }

    if title.split_whitespace().count() <= 2 {
        return 0;
    }
    if title.contains(':') {
        return 1;
    }
    if title.chars().count() > 50 {
        return 2;
    }
    1
}

/// Fold sections with identical titles together and order by level.
///
/// Field lists are concatenated in first-seen order and the sort is stable, so
/// sections on the same level keep their document order. Running this twice
/// changes nothing.
pub fn merge_sections(sections: Vec<FormSection>) -> Vec<FormSection> {
    let mut merged: Vec<FormSection> = Vec::new();
    let mut index_by_title: HashMap<String, usize> = HashMap::new();

    for section in sections {
        match index_by_title.get(&section.title) {
            Some(&idx) => merged[idx].fields.extend(section.fields),
            None => {
                index_by_title.insert(section.title.clone(), merged.len());
                merged.push(section);
            }
        }
    }

    merged.sort_by_key(|s| s.level);
    merged
}

/// Gate for trusting a converter's output: every section needs an id and a
/// title, and every field needs an id and a label. Nested sections are
/// checked the same way.
pub fn validate_form_structure(sections: &[FormSection]) -> bool {
    sections.iter().all(validate_section)
}

fn validate_section(section: &FormSection) -> bool {
    if section.id.is_empty() || section.title.is_empty() {
        return false;
    }
    section.fields.iter().all(|node| match node {
        FormNode::Field(field) => validate_field(field),
        FormNode::Section(nested) => validate_section(nested),
    })
}

fn validate_field(field: &FormField) -> bool {
    !field.id.is_empty() && !field.label.trim().is_empty()
}
