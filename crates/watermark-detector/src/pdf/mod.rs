//! PDF watermark heuristics
//!
//! Pages are scanned in order; on each page the text runs are checked before
//! the images, and the first run or image that clears its threshold is the
//! answer. Nothing after a hit is examined.

pub mod content;

use form_types::{WatermarkDetectionResult, WatermarkKind, WatermarkLocation};
use lopdf::Document;
use tracing::{debug, warn};

use crate::rules::CompiledRules;
use crate::WatermarkError;
use content::{ImagePlacement, TextRun};

/// Each of the five text signals is worth this much
pub const TEXT_SIGNAL_WEIGHT: f64 = 0.2;

/// Text hits must score strictly above this
pub const TEXT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Run counts as rotated when the skew component of its transform exceeds this
pub const DIAGONAL_SKEW: f64 = 0.1;

pub const IMAGE_LARGE_WEIGHT: f64 = 0.3;

pub const IMAGE_TRANSPARENCY_WEIGHT: f64 = 0.4;

pub const IMAGE_CENTERED_WEIGHT: f64 = 0.3;

/// Image hits must score strictly above this
pub const IMAGE_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Max distance, in points, between image and page centers to count as centered
pub const CENTER_TOLERANCE: f64 = 100.0;

pub(crate) fn scan_bytes(
    bytes: &[u8],
    rules: &CompiledRules,
) -> Result<WatermarkDetectionResult, WatermarkError> {
    let doc = Document::load_mem(bytes)?;
    scan_document(&doc, rules)
}

pub(crate) fn scan_document(
    doc: &Document,
    rules: &CompiledRules,
) -> Result<WatermarkDetectionResult, WatermarkError> {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(WatermarkError::InvalidPdf("document has no pages".to_string()));
    }

    for (page_number, page_id) in pages {
        let items = match content::page_items(doc, page_id) {
            Ok(items) => items,
            Err(e) => {
                warn!(page = page_number, error = %e, "Skipping unreadable page");
                continue;
            }
        };

        if let Some(hit) = items
            .text_runs
            .iter()
            .find_map(|run| score_text_run(run, rules, page_number))
        {
            debug!(page = page_number, confidence = hit.confidence, "Text watermark found");
            return Ok(hit);
        }

        let media = content::media_box(doc, page_id);
        if let Some(hit) = items
            .images
            .iter()
            .find_map(|image| score_image(image, media, page_number))
        {
            debug!(page = page_number, confidence = hit.confidence, "Image watermark found");
            return Ok(hit);
        }
    }

    Ok(WatermarkDetectionResult::none())
}

/// Score a run that mentions a watermark keyword or pattern.
///
/// Signals: large glyphs, transparency, rotation, pattern match, brand match.
pub(crate) fn score_text_run(
    run: &TextRun,
    rules: &CompiledRules,
    page: u32,
) -> Option<WatermarkDetectionResult> {
    let keyword = rules.has_keyword(&run.text);
    let pattern = rules.has_pattern(&run.text);
    if !keyword && !pattern {
        return None;
    }

    let signals = [
        run.height() > rules.rules.large_font_size,
        run.alpha < 1.0,
        run.transform.b.abs() > DIAGONAL_SKEW,
        pattern,
        rules.has_brand_pattern(&run.text),
    ];
    let confidence = signals.iter().filter(|s| **s).count() as f64 * TEXT_SIGNAL_WEIGHT;
    if confidence <= TEXT_CONFIDENCE_THRESHOLD {
        return None;
    }

    Some(WatermarkDetectionResult {
        has_watermark: true,
        kind: Some(WatermarkKind::Text),
        content: Some(run.text.clone()),
        confidence,
        location: Some(WatermarkLocation {
            page,
            x: run.transform.e,
            y: run.transform.f,
            rotation: run.rotation_degrees(),
        }),
    })
}

/// Score an image by size relative to the page, transparency and centering
pub(crate) fn score_image(
    image: &ImagePlacement,
    media: [f64; 4],
    page: u32,
) -> Option<WatermarkDetectionResult> {
    let page_width = media[2] - media[0];
    let page_height = media[3] - media[1];
    let page_center = (media[0] + page_width / 2.0, media[1] + page_height / 2.0);
    let (cx, cy) = image.center();

    let large = image.width() > page_width / 2.0 || image.height() > page_height / 2.0;
    let transparent = image.has_soft_mask || image.alpha < 1.0;
    let centered = (cx - page_center.0).abs() < CENTER_TOLERANCE
        && (cy - page_center.1).abs() < CENTER_TOLERANCE;

    let confidence = [
        (large, IMAGE_LARGE_WEIGHT),
        (transparent, IMAGE_TRANSPARENCY_WEIGHT),
        (centered, IMAGE_CENTERED_WEIGHT),
    ]
    .iter()
    .filter(|(hit, _)| *hit)
    .map(|(_, weight)| weight)
    .sum::<f64>();

    if confidence <= IMAGE_CONFIDENCE_THRESHOLD {
        return None;
    }

    Some(WatermarkDetectionResult {
        has_watermark: true,
        kind: Some(WatermarkKind::Image),
        content: None,
        confidence,
        location: Some(WatermarkLocation {
            page,
            x: cx,
            y: cy,
            rotation: image.ctm.b.atan2(image.ctm.a).to_degrees(),
        }),
    })
}
