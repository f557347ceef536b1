//! Document builders for watermark tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn text_ops(text: &str, size: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(size)]),
        Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Text drawn at 45 degrees through the page center
pub fn diagonal_text_ops(text: &str, size: i64) -> Vec<Operation> {
    let (sin, cos) = 45f32.to_radians().sin_cos();
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(size)]),
        Operation::new(
            "Tm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Integer(150),
                Object::Integer(250),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Wrap operations in `q /GS1 gs ... Q` (GS1 has fill alpha 0.3)
pub fn transparent(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(b"GS1".to_vec())]),
    ];
    out.extend(ops);
    out.push(Operation::new("Q", vec![]));
    out
}

/// Paint the soft-masked image `Im1` scaled to `w`x`h` at (`x`, `y`)
pub fn image_ops(w: i64, h: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Integer(w),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(h),
                Object::Integer(x),
                Object::Integer(y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// Paint form XObject `Fm1`, whose content is `form_ops`
pub fn form_ops() -> Vec<Operation> {
    vec![Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())])]
}

/// Build a PDF with one page per entry. Every page shares a resource
/// dictionary with font F1, ExtGState GS1, image Im1 and form Fm1.
pub fn build_pdf(pages: Vec<Vec<Operation>>, form_content: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let fonts = Dictionary::from_iter(vec![("F1", Object::Reference(font_id))]);

    let gs_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(0.3)),
    ]));

    let mask_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(1)),
            ("Height", Object::Integer(1)),
            ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]),
        vec![0x40],
    ));
    let image_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(1)),
            ("Height", Object::Integer(1)),
            ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("SMask", Object::Reference(mask_id)),
        ]),
        vec![0x80],
    ));

    let form_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Form".to_vec())),
            (
                "BBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(fonts.clone()),
                )])),
            ),
        ]),
        Content {
            operations: form_content,
        }
        .encode()
        .unwrap(),
    ));

    let resources_id = doc.add_object(Dictionary::from_iter(vec![
        ("Font", Object::Dictionary(fonts)),
        (
            "ExtGState",
            Object::Dictionary(Dictionary::from_iter(vec![("GS1", Object::Reference(gs_id))])),
        ),
        (
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Im1", Object::Reference(image_id)),
                ("Fm1", Object::Reference(form_id)),
            ])),
        ),
    ]));

    let mut page_ids = Vec::new();
    for operations in pages {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            Content { operations }.encode().unwrap(),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    // MediaBox and Resources live on the Pages node and are inherited
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        ),
        ("Resources", Object::Reference(resources_id)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Minimal DOCX: one paragraph per body entry, optional header paragraph
pub fn write_docx(path: &Path, body: &[&str], header: Option<&str>) {
    let paragraphs: String = body
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        paragraphs
    );

    let mut entries = vec![("word/document.xml".to_string(), document)];
    if let Some(text) = header {
        entries.push((
            "word/header1.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:v="urn:schemas-microsoft-com:vml"><w:p><w:r><w:pict><v:shape><v:textpath string="{}"/></v:shape></w:pict></w:r></w:p></w:hdr>"#,
                text
            ),
        ));
    }
    write_zip(path, &entries);
}

/// Minimal XLSX with one sheet of inline-string cells
pub fn write_xlsx(path: &Path, rows: &[&[&str]]) {
    let sheet_rows: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let cells: String = cells
                .iter()
                .enumerate()
                .map(|(c, value)| {
                    format!(
                        r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        (b'A' + c as u8) as char,
                        r + 1,
                        value
                    )
                })
                .collect();
            format!(r#"<row r="{}">{}</row>"#, r + 1, cells)
        })
        .collect();

    let entries = vec![
        (
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                sheet_rows
            ),
        ),
    ];
    write_zip(path, &entries);
}

fn write_zip(path: &Path, entries: &[(String, String)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
