//! PDF text-layer fallback using pdf-extract.

use async_trait::async_trait;
use tracing::debug;

use super::{EngineOutput, ExtractError, ExtractionEngine, ExtractionMetadata};

pub struct PdfTextEngine;

#[async_trait]
impl ExtractionEngine for PdfTextEngine {
    fn name(&self) -> &'static str {
        "pdf-text"
    }

    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        _mime_type: &str,
    ) -> Result<EngineOutput, ExtractError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractError::Unsupported(format!(
                "'{filename}' is not a valid PDF (missing %PDF header)"
            )));
        }

        // pdf-extract is CPU-bound and may panic on malformed input; the
        // blocking pool contains both.
        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || extract_pdf_text(&owned))
            .await
            .map_err(|e| ExtractError::Failed(format!("PDF task join error: {e}")))?
            .map_err(|e| ExtractError::Failed(format!("PDF extraction failed: {e}")))?;

        let pages = count_pages(&text);
        debug!(filename, pages, "Extracted PDF text layer");

        Ok(EngineOutput {
            text,
            metadata: ExtractionMetadata {
                pages: Some(pages),
                tables: None,
            },
        })
    }
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
}

/// pdf-extract separates pages with form feeds.
fn count_pages(text: &str) -> u32 {
    text.matches('\u{c}').count() as u32 + 1
}
