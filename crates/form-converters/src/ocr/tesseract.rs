//! Tesseract over pdfium-rendered pages

use form_types::Bounds;
use leptess::{LepTess, Variable};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use super::{OcrWord, PageRecognizer};
use crate::config::OcrConfig;
use crate::error::ConverterError;

/// PDF user space is 72 points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Fully automatic page segmentation
const PSM_AUTO: &str = "3";

pub struct TesseractRecognizer {
    pdfium: Pdfium,
    tess: LepTess,
    dpi: u32,
    min_confidence: i32,
}

impl TesseractRecognizer {
    pub fn launch(config: &OcrConfig) -> Result<Self, ConverterError> {
        let bindings = match &config.pdfium_library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConverterError::tool("pdfium", format!("failed to bind library: {}", e)))?;

        let mut tess = LepTess::new(config.tessdata_dir.as_deref(), &config.language).map_err(|e| {
            ConverterError::tool(
                "tesseract",
                format!("failed to load language '{}': {}", config.language, e),
            )
        })?;
        tess.set_variable(Variable::TesseditPagesegMode, PSM_AUTO)
            .map_err(|e| ConverterError::tool("tesseract", format!("failed to set PSM: {}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            tess,
            dpi: config.dpi,
            min_confidence: config.min_confidence,
        })
    }

    fn render_first_page(&self, pdf: &Path) -> Result<Vec<u8>, ConverterError> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| ConverterError::Pdf(e.to_string()))?;
        let page = document
            .pages()
            .get(0)
            .map_err(|e| ConverterError::Pdf(format!("no first page: {}", e)))?;

        let scale = self.dpi as f32 / POINTS_PER_INCH;
        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width((page.width().value * scale) as i32)
                    .set_target_height((page.height().value * scale) as i32)
                    .render_form_data(true),
            )
            .map_err(|e| ConverterError::tool("pdfium", format!("failed to render page: {}", e)))?;

        let mut png = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| ConverterError::tool("pdfium", format!("failed to encode page: {}", e)))?;
        Ok(png.into_inner())
    }
}

impl PageRecognizer for TesseractRecognizer {
    fn first_page_words(&mut self, pdf: &Path) -> Result<Vec<OcrWord>, ConverterError> {
        let png = self.render_first_page(pdf)?;
        self.tess
            .set_image_from_mem(&png)
            .map_err(|e| ConverterError::tool("tesseract", format!("failed to load page image: {}", e)))?;

        // No boxes means a blank page
        let Some(boxes) = self
            .tess
            .get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
        else {
            return Ok(Vec::new());
        };

        let mut words = Vec::new();
        for word_box in &boxes {
            let geom = word_box.get_geometry();
            self.tess.set_rectangle(geom.x, geom.y, geom.w, geom.h);

            let text = self.tess.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let confidence = self.tess.mean_text_conf();
            if confidence < self.min_confidence {
                continue;
            }
            words.push(OcrWord {
                text,
                confidence: confidence as f64,
                bounds: Bounds {
                    x: geom.x as f64,
                    y: geom.y as f64,
                    width: geom.w as f64,
                    height: geom.h as f64,
                },
            });
        }

        debug!(words = words.len(), "Page recognised");
        Ok(words)
    }
}
