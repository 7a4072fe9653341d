//! Text extraction from uploaded reports.
//!
//! Images go to Tesseract. PDFs are read from their text layer and fall
//! back to page-by-page OCR when the layer is empty.

mod media;
mod ocr;
pub mod pdf;
mod tables;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ExtractionConfig;
use crate::error::{AppError, Result};

pub use media::MediaKind;
pub use ocr::TesseractOcr;
pub use pdf::PdfTextExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub page_count: Option<u32>,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, bytes: &[u8]) -> Result<Extraction>;
}

/// One extractor per media kind.
#[derive(Clone)]
pub struct Extractors {
    pub image: Arc<dyn TextExtractor>,
    pub pdf: Arc<dyn TextExtractor>,
}

impl Extractors {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let ocr = TesseractOcr::new(config);
        let fallback = config.ocr_fallback.then(|| ocr.clone());
        Extractors {
            image: Arc::new(ocr),
            pdf: Arc::new(PdfTextExtractor::new(config.page_markers, fallback)),
        }
    }

    /// Extracts text and rejects uploads that yield nothing usable.
    pub async fn extract(&self, kind: MediaKind, bytes: &[u8]) -> Result<Extraction> {
        let extractor = match kind {
            MediaKind::Image => &self.image,
            MediaKind::Pdf => &self.pdf,
        };

        tracing::info!(extractor = extractor.name(), bytes = bytes.len(), "Extracting text");
        let extraction = extractor.extract(bytes).await?;
        if extraction.text.trim().is_empty() {
            return Err(AppError::ExtractionFailure(
                "No readable text found. Please ensure the image/PDF is clear and readable.".to_string(),
            ));
        }

        tracing::info!(
            chars = extraction.text.chars().count(),
            pages = ?extraction.page_count,
            "Text extracted"
        );
        Ok(extraction)
    }
}
