//! Credential checks, prompt submission and the analysis result.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::llm::{ChatCompletion, ChatRequest};
use crate::prompt::{build_prompt, SYSTEM_MESSAGE};

pub const CREDENTIAL_PREFIX: &str = "sk";
pub const CREDENTIAL_MIN_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Hinglish,
}

impl Language {
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::English => "Provide the analysis in clear, professional English.",
            Language::Hindi => "कृपया विश्लेषण स्पष्ट और व्यावसायिक हिंदी में प्रदान करें।",
            Language::Hinglish => {
                "Please provide the analysis in Hinglish (Hindi-English mix) that's easy to understand for Indian users."
            }
        }
    }

    /// BCP 47 tag for the output document.
    pub fn html_lang(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Hinglish => "hi-Latn",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Hinglish => "Hinglish",
        };
        f.write_str(name)
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "english" | "en" => Ok(Language::English),
            "hindi" | "hi" => Ok(Language::Hindi),
            "hinglish" => Ok(Language::Hinglish),
            other => Err(AppError::BadRequest(format!("Unsupported language: {}", other))),
        }
    }
}

/// A bearer token that passed the prefix and length checks.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let key = raw.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(AppError::MissingCredential);
        }
        if !key.starts_with(CREDENTIAL_PREFIX) || key.len() <= CREDENTIAL_MIN_LEN {
            return Err(AppError::MalformedCredential);
        }
        Ok(Credential(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub extracted_text: String,
    pub target_language: Language,
    pub page_count: Option<u32>,
}

impl AnalysisRequest {
    pub fn new(extracted_text: impl Into<String>, target_language: Language) -> Self {
        AnalysisRequest {
            extracted_text: extracted_text.into(),
            target_language,
            page_count: None,
        }
    }

    pub fn with_page_count(mut self, page_count: Option<u32>) -> Self {
        self.page_count = page_count;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis_text: String,
    pub generated_at: DateTime<Utc>,
    pub target_language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_length: Option<usize>,
}

#[derive(Clone)]
pub struct Analyzer {
    chat: Arc<dyn ChatCompletion>,
    settings: LlmConfig,
}

impl Analyzer {
    pub fn new(chat: Arc<dyn ChatCompletion>, settings: LlmConfig) -> Self {
        Analyzer { chat, settings }
    }

    /// Checks the credential, then the input, and only then builds the
    /// prompt and makes the single upstream call.
    pub async fn analyze(&self, credential: Option<&str>, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let credential = Credential::parse(credential)?;
        if request.extracted_text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        let prompt = build_prompt(&request.extracted_text, request.target_language);
        tracing::info!(
            prompt_chars = prompt.len(),
            language = %request.target_language,
            model = %self.settings.model,
            "Calling chat completion endpoint"
        );

        let started = Instant::now();
        let chat_request = ChatRequest::single_turn(&self.settings, SYSTEM_MESSAGE, prompt);
        let analysis_text = self.chat.complete(&credential, &chat_request).await?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            answer_chars = analysis_text.len(),
            "Chat completion succeeded"
        );

        Ok(AnalysisResult {
            analysis_text,
            generated_at: Utc::now(),
            target_language: request.target_language,
            page_count: request.page_count,
            source_length: Some(request.extracted_text.chars().count()),
        })
    }
}
