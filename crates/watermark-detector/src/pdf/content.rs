//! Content stream walk producing positioned text runs and image placements
//!
//! Tracks just enough graphics and text state to answer "how big, how rotated,
//! how transparent" for each show-text and paint-image operation. Glyph widths
//! are not applied, so consecutive runs in one text object share an origin.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::WatermarkError;

/// Form XObjects nested deeper than this are not entered
const MAX_FORM_DEPTH: usize = 4;

/// TJ adjustments more negative than this (thousandths of an em) read as a space
const TJ_SPACE_THRESHOLD: f64 = -250.0;

/// US Letter, used when a page tree carries no MediaBox
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Matrix {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        Some(Matrix {
            a: number(&operands[0])?,
            b: number(&operands[1])?,
            c: number(&operands[2])?,
            d: number(&operands[3])?,
            e: number(&operands[4])?,
            f: number(&operands[5])?,
        })
    }

    /// `self` applied first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

/// A show-text operation with its rendering transform (font size folded in)
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub transform: Matrix,
    pub alpha: f64,
}

impl TextRun {
    /// Rendered glyph height in user space
    pub fn height(&self) -> f64 {
        self.transform.c.hypot(self.transform.d)
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.transform.b.atan2(self.transform.a).to_degrees()
    }
}

/// An image painted with `Do`; `ctm` maps the unit square onto the page
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub ctm: Matrix,
    pub has_soft_mask: bool,
    pub alpha: f64,
}

impl ImagePlacement {
    pub fn width(&self) -> f64 {
        self.ctm.a.hypot(self.ctm.b)
    }

    pub fn height(&self) -> f64 {
        self.ctm.c.hypot(self.ctm.d)
    }

    pub fn center(&self) -> (f64, f64) {
        self.ctm.apply(0.5, 0.5)
    }
}

#[derive(Debug, Default)]
pub struct PageItems {
    pub text_runs: Vec<TextRun>,
    pub images: Vec<ImagePlacement>,
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill_alpha: f64,
    font_size: f64,
    leading: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_alpha: 1.0,
            font_size: 0.0,
            leading: 0.0,
        }
    }
}

/// Collect text runs and images from one page, including nested form XObjects
pub fn page_items(doc: &Document, page_id: ObjectId) -> Result<PageItems, WatermarkError> {
    let bytes = doc.get_page_content(page_id)?;
    let resources = page_resources(doc, page_id);

    let mut walker = Walker {
        doc,
        items: PageItems::default(),
    };
    walker.run(&bytes, resources, GraphicsState::default(), 0)?;
    Ok(walker.items)
}

/// `[x0 y0 x1 y1]`, inherited through the page tree
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let parsed = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|arr| {
            let values: Vec<f64> = arr.iter().filter_map(number).collect();
            (values.len() == 4).then(|| [values[0], values[1], values[2], values[3]])
        });
    parsed.unwrap_or(DEFAULT_MEDIA_BOX)
}

struct Walker<'a> {
    doc: &'a Document,
    items: PageItems,
}

impl<'a> Walker<'a> {
    fn run(
        &mut self,
        bytes: &[u8],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) -> Result<(), WatermarkError> {
        let content = Content::decode(bytes)?;

        let mut state = initial;
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => saved.push(state),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.then(&state.ctm);
                    }
                }
                "gs" => {
                    if let Some(alpha) = operands
                        .first()
                        .and_then(|name| self.ext_gstate_alpha(resources, name))
                    {
                        state.fill_alpha = alpha;
                    }
                }
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(size) = operands.get(1).and_then(number) {
                        state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(number) {
                        state.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    line_matrix = Matrix::translate(tx, ty).then(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        line_matrix = m;
                        text_matrix = m;
                    }
                }
                "T*" => {
                    line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" | "'" | "\"" | "TJ" => {
                    if op.operator == "'" || op.operator == "\"" {
                        line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                        text_matrix = line_matrix;
                    }
                    let shown = match op.operator.as_str() {
                        "TJ" => operands.first().map(text_array),
                        "\"" => operands.get(2).and_then(text_string),
                        _ => operands.first().and_then(text_string),
                    };
                    if let Some(text) = shown.filter(|t| !t.trim().is_empty()) {
                        let transform = Matrix::scale(state.font_size, state.font_size)
                            .then(&text_matrix)
                            .then(&state.ctm);
                        self.items.text_runs.push(TextRun {
                            text,
                            transform,
                            alpha: state.fill_alpha,
                        });
                    }
                }
                "Do" => {
                    if let Some(name) = operands.first() {
                        self.paint_xobject(resources, name, &state, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn paint_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &Object,
        state: &GraphicsState,
        depth: usize,
    ) -> Result<(), WatermarkError> {
        let Some(stream) = self
            .resource(resources, b"XObject", name)
            .and_then(|obj| obj.as_stream().ok())
        else {
            return Ok(());
        };

        let subtype = stream.dict.get(b"Subtype").and_then(|s| s.as_name()).ok();
        match subtype {
            Some(b"Image") => {
                let has_soft_mask =
                    stream.dict.get(b"SMask").is_ok() || stream.dict.get(b"Mask").is_ok();
                self.items.images.push(ImagePlacement {
                    ctm: state.ctm,
                    has_soft_mask,
                    alpha: state.fill_alpha,
                });
                Ok(())
            }
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| resolve(self.doc, m))
                    .and_then(|m| m.as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve(self.doc, r))
                    .and_then(|r| r.as_dict().ok())
                    .or(resources);

                let nested = GraphicsState {
                    ctm: form_matrix.then(&state.ctm),
                    ..*state
                };
                let bytes = stream_bytes(stream)?;
                self.run(&bytes, form_resources, nested, depth + 1)
            }
            _ => Ok(()),
        }
    }

    /// Fill alpha (`ca`, falling back to `CA`) of a named ExtGState
    fn ext_gstate_alpha(&self, resources: Option<&'a Dictionary>, name: &Object) -> Option<f64> {
        let dict = self
            .resource(resources, b"ExtGState", name)
            .and_then(|obj| obj.as_dict().ok())?;
        dict.get(b"ca")
            .or_else(|_| dict.get(b"CA"))
            .ok()
            .and_then(number)
    }

    fn resource(
        &self,
        resources: Option<&'a Dictionary>,
        category: &[u8],
        name: &Object,
    ) -> Option<&'a Object> {
        let key = name.as_name().ok()?;
        let group = resources?.get(category).ok()?;
        let group = resolve(self.doc, group)?.as_dict().ok()?;
        resolve(self.doc, group.get(key).ok()?)
    }
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
}

/// Look up `key` on the page, then up the `/Parent` chain
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded walk; malformed trees can loop
    for _ in 0..32 {
        let dict = doc.get_object(current).and_then(|o| o.as_dict()).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, WatermarkError> {
    if stream.dict.get(b"Filter").is_ok() {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn text_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

fn text_array(obj: &Object) -> String {
    let mut out = String::new();
    if let Object::Array(parts) = obj {
        for part in parts {
            match part {
                Object::String(bytes, _) => out.push_str(&decode_pdf_string(bytes)),
                other => {
                    if number(other).is_some_and(|n| n < TJ_SPACE_THRESHOLD) {
                        out.push(' ');
                    }
                }
            }
        }
    }
    out
}

/// UTF-16BE with BOM, else UTF-8, else Latin-1
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
