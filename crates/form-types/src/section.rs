//! Sections and the field-or-section union they contain

use serde::{Deserialize, Serialize};

use crate::field::FormField;

/// Entry in a section's field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormNode {
    Field(FormField),
    Section(FormSection),
}

impl FormNode {
    pub fn as_field(&self) -> Option<&FormField> {
        match self {
            FormNode::Field(field) => Some(field),
            FormNode::Section(_) => None,
        }
    }
}

impl From<FormField> for FormNode {
    fn from(field: FormField) -> Self {
        FormNode::Field(field)
    }
}

impl From<FormSection> for FormNode {
    fn from(section: FormSection) -> Self {
        FormNode::Section(section)
    }
}

/// Ordered group of fields sharing a heading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub id: String,
    pub title: String,
    pub fields: Vec<FormNode>,
    /// 0 is a top-level heading
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Title of the enclosing section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl FormSection {
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            fields: Vec::new(),
            level,
            description: None,
            parent: None,
        }
    }

    pub fn push(&mut self, node: impl Into<FormNode>) {
        self.fields.push(node.into());
    }

    /// All leaf fields, depth-first in document order
    pub fn leaf_fields(&self) -> Vec<&FormField> {
        let mut out = Vec::new();
        collect_leaves(&self.fields, &mut out);
        out
    }
}

fn collect_leaves<'a>(nodes: &'a [FormNode], out: &mut Vec<&'a FormField>) {
    for node in nodes {
        match node {
            FormNode::Field(field) => out.push(field),
            FormNode::Section(section) => collect_leaves(&section.fields, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    #[test]
    fn test_nodes_are_tagged_by_kind() {
        let mut section = FormSection::new("Personal Info", 0);
        section.push(FormField::new("Name", FieldType::Input, vec![]));
        section.push(FormSection::new("Address", 1));

        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["fields"][0]["kind"], "field");
        assert_eq!(json["fields"][0]["type"], "input");
        assert_eq!(json["fields"][1]["kind"], "section");

        let back: FormSection = serde_json::from_value(json).unwrap();
        assert_eq!(back, section);
    }

    #[test]
    fn test_leaf_fields_descend_into_nested_sections() {
        let mut inner = FormSection::new("Address", 1);
        inner.push(FormField::new("Street", FieldType::Input, vec![]));

        let mut outer = FormSection::new("Personal Info", 0);
        outer.push(FormField::new("Name", FieldType::Input, vec![]));
        outer.push(inner);
        outer.push(FormField::new("Email", FieldType::Input, vec![]));

        let labels: Vec<_> = outer.leaf_fields().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Name", "Street", "Email"]);
    }
}
