//! Google Document AI form parser

use async_trait::async_trait;
use base64::Engine;
use form_types::{Bounds, ConversionContent, ConversionResult, FormField};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use super::{polygon_bounds, refine_by_value};
use crate::config::ConverterConfig;
use crate::converter::{ConversionOptions, Converter};
use crate::error::{ensure_success, ConverterError};
use crate::gate::WatermarkGate;
use crate::normalize::PdfNormalizer;
use crate::pipeline::{assemble_fields, Candidate};

const SERVICE: &str = "Document AI";

const SUPPORTED: &[&str] = &["pdf", "docx", "xlsx"];

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    #[serde(default)]
    form_fields: Vec<PageFormField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageFormField {
    #[serde(default)]
    field_name: Option<Layout>,
    #[serde(default)]
    field_value: Option<Layout>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Layout {
    #[serde(default)]
    text_anchor: Option<TextAnchor>,
    #[serde(default)]
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnchor {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text_segments: Vec<TextSegment>,
}

/// int64 indices arrive as JSON strings and zero is omitted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextSegment {
    #[serde(default)]
    start_index: Option<Value>,
    #[serde(default)]
    end_index: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingPoly {
    #[serde(default)]
    normalized_vertices: Vec<Vertex>,
}

#[derive(Debug, Deserialize)]
struct Vertex {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

impl Layout {
    fn text(&self, document_text: &str) -> Option<String> {
        let anchor = self.text_anchor.as_ref()?;
        let text = match &anchor.content {
            Some(content) => content.clone(),
            None => anchor
                .text_segments
                .iter()
                .map(|s| {
                    let start = index(&s.start_index);
                    let end = index(&s.end_index).max(start);
                    document_text.chars().skip(start).take(end - start).collect::<String>()
                })
                .collect(),
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    fn bounds(&self) -> Option<Bounds> {
        let poly = self.bounding_poly.as_ref()?;
        polygon_bounds(poly.normalized_vertices.iter().map(|v| (v.x, v.y)))
    }
}

fn index(value: &Option<Value>) -> usize {
    match value {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        _ => 0,
    }
}

pub struct DocumentAiConverter {
    endpoint: String,
    processor_name: String,
    access_token: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
    normalizer: PdfNormalizer,
    gate: Option<WatermarkGate>,
}

impl DocumentAiConverter {
    /// Fails when no Google Cloud project is configured
    pub fn new(config: &ConverterConfig, gate: Option<WatermarkGate>) -> Result<Self, ConverterError> {
        Ok(Self {
            processor_name: config.google.processor_name()?,
            endpoint: config.google.endpoint(),
            access_token: config.google.access_token.clone(),
            client: config.http_client()?,
            timeout_secs: config.http_timeout_secs,
            normalizer: PdfNormalizer::new(config.soffice_bin.clone(), config.http_timeout()),
            gate,
        })
    }

    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    #[instrument(skip(self, options), fields(converter = "document-ai"))]
    async fn run(&self, path: &Path, options: &ConversionOptions) -> Result<ConversionResult, ConverterError> {
        let gate = self.gate.as_ref().filter(|_| options.watermark_check);
        if watermark_detector::extension(path) == "pdf" {
            if let Some(gate) = gate {
                gate.check(path).await?;
            }
        }
        // Temporary conversions are removed when `source` drops
        let source = self.normalizer.ensure_pdf(path, gate).await?;
        let bytes = tokio::fs::read(source.path()).await?;
        let document = self.process(&bytes).await?;
        drop(source);

        let fields = form_fields(&document);
        if fields.is_empty() {
            return Err(ConverterError::NoFields);
        }
        info!(fields = fields.len(), "Document AI fields mapped");
        let content = ConversionContent::Document {
            text: document.text,
            fields: fields.clone(),
        };
        Ok(assemble_fields(content, fields))
    }

    async fn process(&self, pdf: &[u8]) -> Result<Document, ConverterError> {
        let url = format!("{}/v1/{}:process", self.endpoint, self.processor_name);
        let body = json!({
            "rawDocument": {
                "content": base64::engine::general_purpose::STANDARD.encode(pdf),
                "mimeType": "application/pdf",
            }
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        debug!(url = %url, bytes = pdf.len(), "Sending document to processor");

        let response = request
            .send()
            .await
            .map_err(|e| ConverterError::from_http(SERVICE, self.timeout_secs, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let parsed: ProcessResponse = response
            .json()
            .await
            .map_err(|e| ConverterError::from_http(SERVICE, self.timeout_secs, e))?;
        parsed
            .document
            .ok_or_else(|| ConverterError::backend(SERVICE, "response carried no document"))
    }
}

/// Key/value pairs across all pages, typed by label then by value shape
fn form_fields(document: &Document) -> Vec<FormField> {
    document
        .pages
        .iter()
        .flat_map(|page| page.form_fields.iter())
        .filter_map(|pair| {
            let name = pair.field_name.as_ref()?;
            let label = name.text(&document.text)?;
            let value = pair.field_value.as_ref().and_then(|v| v.text(&document.text));

            let mut candidate = Candidate::new(label).with_bounds(name.bounds());
            if let Some(value) = value {
                candidate = candidate.with_value(value);
            }
            let mut field = candidate.into_field();
            if field.label.is_empty() {
                return None;
            }
            refine_by_value(&mut field);
            Some(field)
        })
        .collect()
}

#[async_trait]
impl Converter for DocumentAiConverter {
    fn name(&self) -> &'static str {
        "DocumentAiConverter"
    }

    fn supports(&self, file_type: &str) -> bool {
        SUPPORTED.contains(&file_type)
    }

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        match self.run(path, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Document AI conversion failed");
                ConversionResult::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_types::FieldType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_project_is_reported_at_construction() {
        let err = DocumentAiConverter::new(&ConverterConfig::default(), None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Google Cloud Project ID not configured");
    }

    #[test]
    fn test_form_fields_resolve_segments_and_value_shapes() {
        let response: ProcessResponse = serde_json::from_value(json!({
            "document": {
                "text": "Name: Jane Doe\nHired: 03/14/2022\n",
                "pages": [{
                    "formFields": [
                        {
                            "fieldName": {
                                "textAnchor": {"textSegments": [{"endIndex": "5"}]},
                                "boundingPoly": {"normalizedVertices": [
                                    {"x": 0.1, "y": 0.2}, {"x": 0.3, "y": 0.2},
                                    {"x": 0.3, "y": 0.25}, {"x": 0.1, "y": 0.25}
                                ]}
                            },
                            "fieldValue": {
                                "textAnchor": {"textSegments": [{"startIndex": "6", "endIndex": "14"}]}
                            }
                        },
                        {
                            "fieldName": {"textAnchor": {"content": "Hired:"}},
                            "fieldValue": {"textAnchor": {"content": "03/14/2022"}}
                        },
                        {
                            "fieldValue": {"textAnchor": {"content": "orphan"}}
                        }
                    ]
                }]
            }
        }))
        .unwrap();

        let fields = form_fields(&response.document.unwrap());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label, "Name");
        assert_eq!(fields[0].value.as_deref(), Some("Jane Doe"));
        assert!(fields[0].bounds.is_some());
        assert_eq!(fields[1].label, "Hired");
        assert_eq!(fields[1].field_type, FieldType::Date);
    }

    #[test]
    fn test_numeric_indices_are_accepted() {
        assert_eq!(index(&Some(json!(12))), 12);
        assert_eq!(index(&Some(json!("7"))), 7);
        assert_eq!(index(&None), 0);
    }
}
