use async_trait::async_trait;
use lopdf::Document;

use super::ocr::TesseractOcr;
use super::tables::split_tables;
use super::{Extraction, TextExtractor};
use crate::error::{AppError, Result};

/// Reads the PDF text layer page by page, falling back to OCR for scanned
/// documents when an OCR engine is attached.
pub struct PdfTextExtractor {
    page_markers: bool,
    ocr_fallback: Option<TesseractOcr>,
}

impl PdfTextExtractor {
    pub fn new(page_markers: bool, ocr_fallback: Option<TesseractOcr>) -> Self {
        PdfTextExtractor {
            page_markers,
            ocr_fallback,
        }
    }
}

/// Page texts in page order. Pages whose text cannot be decoded are empty.
pub fn read_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let document = Document::load_mem(bytes)
        .map_err(|e| AppError::ExtractionFailure(format!("Failed to load PDF: {}", e)))?;

    let pages = document
        .get_pages()
        .into_keys()
        .map(|page_number| match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "Failed to extract page text");
                String::new()
            }
        })
        .collect();
    Ok(pages)
}

pub fn join_pages(pages: &[String], page_markers: bool) -> String {
    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        let body = split_tables(page);
        if body.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        if page_markers {
            out.push_str(&format!("--- Page {} ---\n", index + 1));
        }
        out.push_str(&body);
    }
    out
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf-text"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let owned = bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || read_pages(&owned))
            .await
            .map_err(|e| AppError::ExtractionFailure(format!("PDF parsing task failed: {}", e)))??;

        let page_count = pages.len() as u32;
        let text = join_pages(&pages, self.page_markers);
        if !text.trim().is_empty() {
            return Ok(Extraction {
                text,
                page_count: Some(page_count),
            });
        }

        match &self.ocr_fallback {
            Some(ocr) => {
                tracing::info!(pages = page_count, "No text layer found, running OCR");
                ocr.recognize_pdf(bytes).await
            }
            None => Ok(Extraction {
                text,
                page_count: Some(page_count),
            }),
        }
    }
}
