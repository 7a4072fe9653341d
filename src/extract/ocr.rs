//! Tesseract and pdftoppm wrappers. Both run as external processes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::{Extraction, TextExtractor};
use crate::config::ExtractionConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    pdftoppm: String,
    languages: String,
}

impl TesseractOcr {
    pub fn new(config: &ExtractionConfig) -> Self {
        TesseractOcr {
            binary: config.tesseract_bin.clone(),
            pdftoppm: config.pdftoppm_bin.clone(),
            languages: config.ocr_languages.clone(),
        }
    }

    async fn recognize_file(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .output()
            .await
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ExtractionFailure(format!("Tesseract failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Rasterises every page of a PDF and OCRs them in page order, one
    /// blank line between pages.
    pub async fn recognize_pdf(&self, pdf: &[u8]) -> Result<Extraction> {
        let dir = tempfile::tempdir()
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to create temp dir: {}", e)))?;
        let input = dir.path().join("report.pdf");
        tokio::fs::write(&input, pdf)
            .await
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to write temp file: {}", e)))?;

        let prefix = dir.path().join("page");
        let output = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg("300")
            .arg("-png")
            .arg(&input)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to run {}: {}", self.pdftoppm, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ExtractionFailure(format!("pdftoppm failed: {}", stderr.trim())));
        }

        let pages = rendered_pages(dir.path()).await?;
        tracing::debug!(pages = pages.len(), "Rasterised PDF for OCR");

        let mut text = String::new();
        for page in &pages {
            text.push_str(&self.recognize_file(page).await?);
            text.push_str("\n\n");
        }

        Ok(Extraction {
            text: text.trim_end().to_string(),
            page_count: Some(pages.len() as u32),
        })
    }
}

/// pdftoppm names pages `page-1.png`, `page-01.png`, ... depending on the
/// page count, so sort by the parsed number rather than the name.
async fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AppError::ExtractionFailure(format!("Failed to list rendered pages: {}", e)))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::ExtractionFailure(format!("Failed to list rendered pages: {}", e)))?
    {
        let path = entry.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

#[async_trait]
impl TextExtractor for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let image = tempfile::Builder::new()
            .prefix("report-")
            .suffix(".img")
            .tempfile()
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to create temp file: {}", e)))?;
        tokio::fs::write(image.path(), bytes)
            .await
            .map_err(|e| AppError::ExtractionFailure(format!("Failed to write temp file: {}", e)))?;

        let text = self.recognize_file(image.path()).await?;
        Ok(Extraction {
            text,
            page_count: None,
        })
    }
}
