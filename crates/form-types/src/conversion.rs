//! Outcome of a single `convert()` call

use serde::{Deserialize, Serialize};

use crate::field::FormField;
use crate::section::FormSection;

/// Raw material a converter extracted before structuring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConversionContent {
    /// Text-bearing documents (PDF, DOCX)
    Document { text: String, fields: Vec<FormField> },
    /// Spreadsheet cells, row-major
    Tabular { rows: Vec<Vec<String>> },
}

impl ConversionContent {
    /// Flat field list; spreadsheets carry none here.
    pub fn fields(&self) -> &[FormField] {
        match self {
            ConversionContent::Document { fields, .. } => fields,
            ConversionContent::Tabular { .. } => &[],
        }
    }
}

/// Either a populated success or an error with nothing else filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ConversionContent>,
    /// Structured sections (the form layout)
    #[serde(rename = "fields", default)]
    pub sections: Vec<FormSection>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn success(content: ConversionContent, sections: Vec<FormSection>, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            success: true,
            content: Some(content),
            sections,
            confidence,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            sections: Vec::new(),
            confidence: 0.0,
            error: Some(error.into()),
        }
    }

    /// Leaf fields across all sections in layout order
    pub fn section_fields(&self) -> Vec<&FormField> {
        self.sections.iter().flat_map(|s| s.leaf_fields()).collect()
    }

    /// Fields to score: the extracted list when present, otherwise the structured ones
    pub fn scored_fields(&self) -> Vec<&FormField> {
        match &self.content {
            Some(ConversionContent::Document { fields, .. }) if !fields.is_empty() => {
                fields.iter().collect()
            }
            _ => self.section_fields(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failure_is_empty() {
        let result = ConversionResult::failure("No converter available for file type: xyz");
        assert!(!result.success);
        assert!(result.sections.is_empty());
        assert!(result.content.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(
            result.error.as_deref(),
            Some("No converter available for file type: xyz")
        );
    }

    #[test]
    fn test_success_clamps_confidence() {
        let content = ConversionContent::Tabular { rows: vec![] };
        assert_eq!(ConversionResult::success(content.clone(), vec![], 2.0).confidence, 1.0);
        assert_eq!(ConversionResult::success(content, vec![], f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_sections_serialize_as_fields() {
        let mut section = FormSection::new("Default Section", 0);
        section.push(FormField::new("Name", FieldType::Input, vec![]));
        let result = ConversionResult::success(
            ConversionContent::Tabular {
                rows: vec![vec!["Name".to_string()]],
            },
            vec![section],
            0.5,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fields"][0]["title"], "Default Section");
        assert_eq!(json["content"]["kind"], "tabular");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_scored_fields_fall_back_to_sections() {
        let mut section = FormSection::new("Default Section", 0);
        section.push(FormField::new("Name", FieldType::Input, vec![]));
        let result = ConversionResult::success(
            ConversionContent::Tabular { rows: vec![] },
            vec![section],
            0.5,
        );
        assert_eq!(result.scored_fields().len(), 1);
    }
}
