//! DOCX and XLSX converter
//!
//! DOCX: every non-trivial body paragraph is a label candidate, filed under
//! the nearest heading-like paragraph above it. Paragraphs styled as Word
//! headings are structure only; unstyled heading-like paragraphs are still
//! candidates themselves. XLSX: the first row of the first sheet is read as
//! column headers, one field per header.

use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use form_types::{ConversionContent, ConversionResult, FieldType, FormField};
use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;

use crate::converter::{ConversionOptions, Converter};
use crate::error::ConverterError;
use crate::gate::WatermarkGate;
use crate::ocr::LABEL_VOCABULARY;
use crate::pipeline::{assemble_fields, assemble_with_levels};

const DOCX_BODY: &str = "word/document.xml";

/// Longest unstyled phrase still read as a heading
const MAX_HEADING_WORDS: usize = 6;
const MAX_HEADING_CHARS: usize = 60;

lazy_static! {
    /// Paragraphs that are only a list marker
    static ref BARE_MARKER: Regex = Regex::new(r"^(\d+\.?|[•·\-*])$").unwrap();
    static ref NUMBERED_HEADING: Regex = Regex::new(r"^\d+\.\s+[A-Z]").unwrap();
    /// Capitalised phrase with nothing after an optional trailing colon
    static ref PHRASE_HEADING: Regex = Regex::new(r"^[A-Z][\w\s&/-]{2,}:?$").unwrap();
    static ref HEADING_STYLE: Regex = Regex::new(r"^(?i)heading\s?([1-4])$").unwrap();
}

/// One `w:p` with its style id and visible text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub style: Option<String>,
    pub text: String,
}

impl Paragraph {
    /// Level stated by a Heading1..4 or Title style
    pub fn styled_level(&self) -> Option<u32> {
        let style = self.style.as_deref()?;
        if style.eq_ignore_ascii_case("title") {
            return Some(0);
        }
        HEADING_STYLE
            .captures(style)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .map(|n| n - 1)
    }

    pub fn is_heading(&self) -> bool {
        let text = self.text.trim();
        !text.is_empty()
            && (self.styled_level().is_some()
                || NUMBERED_HEADING.is_match(text)
                || is_heading_phrase(text))
    }

    fn heading_title(&self) -> String {
        self.text.trim().trim_end_matches(':').trim_end().to_string()
    }
}

/// A short capitalised phrase that does not itself read as a field label
fn is_heading_phrase(text: &str) -> bool {
    if !PHRASE_HEADING.is_match(text) || text.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    let title = text.trim_end_matches(':').trim_end();
    let words: Vec<String> = title.split_whitespace().map(str::to_lowercase).collect();
    if words.len() < 2 || words.len() > MAX_HEADING_WORDS {
        return false;
    }
    if words.iter().any(|w| LABEL_VOCABULARY.contains(&w.as_str())) {
        return false;
    }
    form_engine::detect_field_type(title, "") == FieldType::Input
        && form_engine::detect_validation_rules(title, "").is_empty()
}

pub struct OfficeConverter {
    gate: Option<WatermarkGate>,
}

impl OfficeConverter {
    pub fn new(gate: Option<WatermarkGate>) -> Self {
        Self { gate }
    }

    #[instrument(skip(self))]
    async fn convert_docx(&self, path: &Path) -> Result<ConversionResult, ConverterError> {
        let owned = path.to_path_buf();
        let paragraphs = blocking(move || read_docx_paragraphs(&owned)).await?;
        debug!(paragraphs = paragraphs.len(), "Read DOCX body");
        docx_result(&paragraphs)
    }

    #[instrument(skip(self))]
    async fn convert_xlsx(&self, path: &Path) -> Result<ConversionResult, ConverterError> {
        let owned = path.to_path_buf();
        let rows = blocking(move || read_xlsx_rows(&owned)).await?;
        debug!(rows = rows.len(), "Read XLSX sheet");
        xlsx_result(rows)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ConverterError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConverterError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConverterError::Office(format!("reader aborted: {}", e)))?
}

/// Paragraphs of the DOCX body in document order
pub fn read_docx_paragraphs(path: &Path) -> Result<Vec<Paragraph>, ConverterError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;
    parse_paragraphs(&xml)
}

pub fn parse_paragraphs(xml: &str) -> Result<Vec<Paragraph>, ConverterError> {
    let mut reader = XmlReader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:t" => in_text = true,
                b"w:pStyle" => set_style(&mut current, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:pStyle" => set_style(&mut current, &e),
                b"w:tab" | b"w:br" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push(' ');
                    }
                }
                b"w:p" => paragraphs.push(Paragraph::default()),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| ConverterError::Office(err.to_string()))?;
                if let Some(p) = current.as_mut() {
                    p.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConverterError::Office(format!("XML parse error: {e}"))),
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn set_style(current: &mut Option<Paragraph>, e: &quick_xml::events::BytesStart<'_>) {
    let Some(paragraph) = current.as_mut() else {
        return;
    };
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"w:val" {
            if let Ok(value) = attr.unescape_value() {
                paragraph.style = Some(value.into_owned());
            }
        }
    }
}

/// Label is the text before the first colon, minus fill-in underscores
fn paragraph_label(text: &str) -> String {
    text.split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('_')
        .trim()
        .to_string()
}

pub fn docx_result(paragraphs: &[Paragraph]) -> Result<ConversionResult, ConverterError> {
    let mut fields: Vec<FormField> = Vec::new();
    let mut levels: HashMap<String, u32> = HashMap::new();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        let text = paragraph.text.trim();
        if text.is_empty() || BARE_MARKER.is_match(text) {
            continue;
        }
        if let Some(level) = paragraph.styled_level() {
            levels.insert(paragraph.heading_title(), level);
            continue;
        }

        let label = paragraph_label(text);
        if label.is_empty() {
            continue;
        }
        let section = paragraphs[..i]
            .iter()
            .rev()
            .find(|p| p.is_heading())
            .map(Paragraph::heading_title);

        let mut field = form_engine::build_field(&label, text);
        if field.label.is_empty() {
            continue;
        }
        if let Some(section) = section {
            field = field.with_section(section);
        }
        form_engine::score_field(&mut field);
        fields.push(field);
    }

    if fields.is_empty() {
        return Err(ConverterError::NoFields);
    }
    let text = paragraphs
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let content = ConversionContent::Document {
        text,
        fields: fields.clone(),
    };
    Ok(assemble_with_levels(content, fields, &levels))
}

/// Cells of the first sheet as display strings, row-major
pub fn read_xlsx_rows(path: &Path) -> Result<Vec<Vec<String>>, ConverterError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ConverterError::Office(e.to_string()))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConverterError::Office("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ConverterError::Office(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

pub fn xlsx_result(rows: Vec<Vec<String>>) -> Result<ConversionResult, ConverterError> {
    let fields: Vec<FormField> = rows
        .first()
        .map(|headers| {
            headers
                .iter()
                .filter(|h| !h.trim().is_empty())
                .map(|h| form_engine::build_field(h, ""))
                .filter(|f| !f.label.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if fields.is_empty() {
        return Err(ConverterError::NoFields);
    }
    // Header fields stay out of `content`; it carries the raw cells
    Ok(assemble_fields(ConversionContent::Tabular { rows }, fields))
}

#[async_trait]
impl Converter for OfficeConverter {
    fn name(&self) -> &'static str {
        "OfficeConverter"
    }

    fn supports(&self, file_type: &str) -> bool {
        matches!(file_type, "docx" | "xlsx")
    }

    async fn convert(&self, path: &Path, options: &ConversionOptions) -> ConversionResult {
        if options.watermark_check {
            if let Some(gate) = &self.gate {
                if let Err(e) = gate.check(path).await {
                    return ConversionResult::failure(e.to_string());
                }
            }
        }

        let ext = watermark_detector::extension(path);
        let (result, prefix) = match ext.as_str() {
            "docx" => (self.convert_docx(path).await, "Conversion failed"),
            "xlsx" => (self.convert_xlsx(path).await, "Excel conversion failed"),
            other => (
                Err(ConverterError::UnsupportedFileType(other.to_string())),
                "Conversion failed",
            ),
        };

        match result {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Office conversion failed");
                ConversionResult::failure(format!("{}: {}", prefix, e))
            }
        }
    }
}
