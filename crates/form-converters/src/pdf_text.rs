//! First-page text layer extraction

use tracing::debug;

use crate::error::ConverterError;

/// Text of page one. pdf-extract first (it handles CID fonts and ToUnicode
/// maps), lopdf's extractor when that fails or panics.
pub fn first_page_text(bytes: &[u8]) -> Result<String, ConverterError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => {
            if let Some(first) = pages.into_iter().next() {
                return Ok(first);
            }
            debug!("pdf-extract found no pages, falling back to lopdf");
        }
        Ok(Err(e)) => debug!(error = %e, "pdf-extract failed, falling back to lopdf"),
        Err(_) => debug!("pdf-extract panicked, falling back to lopdf"),
    }

    let doc = lopdf::Document::load_mem(bytes)?;
    if doc.get_pages().is_empty() {
        return Err(ConverterError::Pdf("document has no pages".to_string()));
    }
    Ok(doc.extract_text(&[1])?)
}
