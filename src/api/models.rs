use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::document::{Category, SectionBlock};
use crate::extract::MediaKind;
use crate::session::{SessionContext, SessionUpdate};

#[derive(Deserialize, Default)]
pub struct SessionRequest {
    pub api_key: Option<String>,
    pub preview: Option<bool>,
}

impl From<SessionRequest> for SessionUpdate {
    fn from(req: SessionRequest) -> Self {
        SessionUpdate {
            credential: req.api_key,
            preview_requested: req.preview,
        }
    }
}

/// Never carries the key itself.
#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub has_credential: bool,
    pub preview_requested: bool,
}

impl From<&SessionContext> for SessionResponse {
    fn from(session: &SessionContext) -> Self {
        SessionResponse {
            session_id: session.id,
            has_credential: session.has_credential(),
            preview_requested: session.preview_requested,
        }
    }
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub file_name: Option<String>,
    pub media_kind: MediaKind,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub text_length: usize,
    /// Only present when the session asked for a preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Serialize)]
pub struct SectionSummary {
    pub key: String,
    pub category: Category,
    pub blocks: usize,
}

impl From<&SectionBlock> for SectionSummary {
    fn from(section: &SectionBlock) -> Self {
        SectionSummary {
            key: section.key.clone(),
            category: section.category,
            blocks: section.content.len(),
        }
    }
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub sections: Vec<SectionSummary>,
    pub report_html: String,
}
