pub mod html;
pub mod pdf;

use std::str::FromStr;

use chrono::{DateTime, Local, Utc};

use crate::document::ReportDocument;
use crate::error::{AppError, Result};
use crate::format::plain_section;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html; charset=utf-8",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(AppError::BadRequest(format!("Unsupported output format: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

fn serialize(doc: &ReportDocument, format: OutputFormat) -> std::result::Result<Vec<u8>, RenderError> {
    match format {
        OutputFormat::Html => Ok(html::render(doc).into_bytes()),
        OutputFormat::Pdf => pdf::render(doc),
    }
}

/// Serialises the document. If that fails the report is rebuilt from
/// plain paragraphs of `analysis_text` and serialised again.
pub fn render_report(doc: &ReportDocument, analysis_text: &str, format: OutputFormat) -> Result<RenderedReport> {
    render_with(doc, analysis_text, format, serialize)
}

pub fn render_with<F>(doc: &ReportDocument, analysis_text: &str, format: OutputFormat, serialize: F) -> Result<RenderedReport>
where
    F: Fn(&ReportDocument, OutputFormat) -> std::result::Result<Vec<u8>, RenderError>,
{
    let bytes = match serialize(doc, format) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, format = format.extension(), "Structured render failed, using plain fallback");
            let fallback = doc.with_sections(vec![plain_section(analysis_text)]);
            serialize(&fallback, format).map_err(|e| AppError::RenderingFailure(e.to_string()))?
        }
    };

    tracing::info!(format = format.extension(), bytes = bytes.len(), "Report rendered");
    Ok(RenderedReport {
        bytes,
        content_type: format.content_type(),
        file_name: file_name(&doc.patient.name, doc.patient.generated_at, format),
    })
}

/// `health_analysis_<patient>_<YYYYMMDD_HHMMSS>.<ext>`
pub fn file_name(patient_name: &str, generated_at: DateTime<Utc>, format: OutputFormat) -> String {
    let mut patient: String = patient_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if patient.trim_matches('_').is_empty() {
        patient = "Patient".to_string();
    }
    format!(
        "health_analysis_{}_{}.{}",
        patient,
        generated_at.with_timezone(&Local).format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}
