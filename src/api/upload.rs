use axum::extract::Multipart;
use axum::body::Bytes;

use crate::error::{AppError, Result};
use crate::extract::{Extraction, MediaKind};

pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn media_kind(&self) -> Result<MediaKind> {
        MediaKind::detect(self.content_type.as_deref(), self.file_name.as_deref(), &self.bytes).ok_or_else(|| {
            AppError::UnsupportedMedia(format!(
                "{} ({}); upload a PDF, PNG or JPEG report",
                self.file_name.as_deref().unwrap_or("upload"),
                self.content_type.as_deref().unwrap_or("unknown type")
            ))
        })
    }
}

/// The fields of the upload form. Unknown fields are ignored.
///
/// `text` and `page_count` carry the result of an earlier `/api/extract`
/// call, so a previewed report is not extracted a second time.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub text: Option<String>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
    pub patient_name: Option<String>,
    pub format: Option<String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    tracing::info!(file_name = ?file_name, content_type = ?content_type, size = bytes.len(), "Received upload");
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                "text" => form.text = Some(field.text().await?),
                "page_count" => {
                    let raw = field.text().await?;
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        let pages = trimmed
                            .parse()
                            .map_err(|_| AppError::BadRequest(format!("Invalid page_count: {}", trimmed)))?;
                        form.page_count = Some(pages);
                    }
                }
                "language" => form.language = Some(field.text().await?),
                "patient_name" => form.patient_name = Some(field.text().await?),
                "format" => form.format = Some(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }

    /// Previously extracted text, if the form carries any.
    pub fn take_text(&mut self) -> Option<Extraction> {
        let text = self.text.take().filter(|text| !text.trim().is_empty())?;
        Some(Extraction {
            text,
            page_count: self.page_count,
        })
    }

    pub fn take_file(&mut self) -> Result<UploadedFile> {
        let file = self
            .file
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing 'file' field in upload".to_string()))?;
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        Ok(file)
    }
}
