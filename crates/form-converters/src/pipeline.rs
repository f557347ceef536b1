//! Shared tail of every converter: candidates in, [`ConversionResult`] out

use form_engine::{build_field, mean_field_confidence, merge_sections, process_form_structure};
use form_engine::{score_field, validate_form_structure};
use form_types::{Bounds, ConversionContent, ConversionResult, FormField};
use std::collections::HashMap;
use tracing::warn;

use crate::error::ConverterError;

/// A raw label/value guess pulled out of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub label: String,
    /// Text next to or answering the label; used as detection context
    pub value: Option<String>,
    pub section: Option<String>,
    pub bounds: Option<Bounds>,
}

impl Candidate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.value = Some(value.trim().to_string());
        }
        self
    }

    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.section = section;
        self
    }

    pub fn with_bounds(mut self, bounds: Option<Bounds>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Run the heuristics and score the finished field
    pub fn into_field(self) -> FormField {
        let mut field = build_field(&self.label, self.value.as_deref().unwrap_or(""));
        if let Some(section) = self.section {
            field = field.with_section(section);
        }
        if let Some(value) = self.value {
            field = field.with_value(value);
        }
        if let Some(bounds) = self.bounds {
            field = field.with_bounds(bounds);
        }
        score_field(&mut field);
        field
    }
}

/// Drop candidates whose label normalizes to the same lowercase text as an
/// earlier one. Later duplicates donate bounds the survivor lacks.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = form_engine::normalize_label(&candidate.label).to_lowercase();
        match index.get(&key) {
            Some(&i) => {
                if out[i].bounds.is_none() {
                    out[i].bounds = candidate.bounds;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(candidate);
            }
        }
    }
    out
}

/// Build fields, group them into sections and score the result
pub fn assemble(text: String, candidates: Vec<Candidate>) -> Result<ConversionResult, ConverterError> {
    let fields: Vec<FormField> = candidates
        .into_iter()
        .filter(|c| !form_engine::normalize_label(&c.label).is_empty())
        .map(Candidate::into_field)
        .collect();
    if fields.is_empty() {
        return Err(ConverterError::NoFields);
    }
    let content = ConversionContent::Document {
        text,
        fields: fields.clone(),
    };
    Ok(assemble_fields(content, fields))
}

/// Structure already-built fields under the given content
pub fn assemble_fields(content: ConversionContent, fields: Vec<FormField>) -> ConversionResult {
    assemble_with_levels(content, fields, &HashMap::new())
}

/// As [`assemble_fields`], with section levels the source states outright
/// (styled headings) taking precedence over the inferred ones
pub fn assemble_with_levels(
    content: ConversionContent,
    fields: Vec<FormField>,
    levels: &HashMap<String, u32>,
) -> ConversionResult {
    let confidence = mean_field_confidence(&fields);
    let mut sections = process_form_structure(fields);
    for section in &mut sections {
        if let Some(&level) = levels.get(&section.title) {
            section.level = level;
        }
    }
    let sections = merge_sections(sections);
    if !validate_form_structure(&sections) {
        warn!("Generated form structure failed validation");
    }
    ConversionResult::success(content, sections, confidence)
}
