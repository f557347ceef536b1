//! Office document text extraction for keyword scans
//!
//! DOCX text comes from the body, headers and footers, including the `string`
//! attribute of VML text paths, which is where Word stores its own watermark
//! text. XLSX text is every non-empty cell across all sheets.

use calamine::{open_workbook, Data, Reader, Xlsx};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::WatermarkError;

const DOCX_BODY: &str = "word/document.xml";

pub fn docx_text(path: &Path) -> Result<String, WatermarkError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut parts = vec![DOCX_BODY.to_string()];
    parts.extend(
        archive
            .file_names()
            .filter(|name| {
                (name.starts_with("word/header") || name.starts_with("word/footer"))
                    && name.ends_with(".xml")
            })
            .map(str::to_string),
    );

    let mut text = String::new();
    for part in parts {
        let mut entry = archive.by_name(&part)?;
        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        text.push_str(&xml_text(&xml)?);
        text.push('\n');
    }
    Ok(text)
}

/// Visible text of a WordprocessingML part, one line per paragraph
pub fn xml_text(xml: &str) -> Result<String, WatermarkError> {
    let mut reader = XmlReader::from_str(xml);
    let mut out = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                if e.name().as_ref() == b"v:textpath" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"string" {
                            if let Ok(value) = attr.decode_and_unescape_value(&reader) {
                                out.push_str(&value);
                                out.push('\n');
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| WatermarkError::InvalidOffice(err.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:p" {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(WatermarkError::InvalidOffice(format!("XML parse error: {e}"))),
            _ => {}
        }
    }

    Ok(out)
}

pub fn xlsx_text(path: &Path) -> Result<String, WatermarkError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| WatermarkError::InvalidOffice(e.to_string()))?;

    let mut text = String::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| WatermarkError::InvalidOffice(e.to_string()))?;
        for row in range.rows() {
            for cell in row {
                if !matches!(cell, Data::Empty) {
                    text.push_str(&cell.to_string());
                    text.push('\n');
                }
            }
        }
    }
    Ok(text)
}
