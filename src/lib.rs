pub mod analysis;
pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod format;
pub mod llm;
pub mod prompt;
pub mod render;
pub mod session;

use std::sync::Arc;

use analysis::Analyzer;
use config::Config;
use error::Result;
use extract::Extractors;
use llm::{ChatCompletion, OpenAiChat};
use session::SessionStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub analyzer: Analyzer,
    pub extractors: Extractors,
}

impl AppState {
    /// Production wiring: Tesseract/lopdf extraction and the OpenAI-compatible endpoint.
    pub fn from_config(config: Config) -> Result<Self> {
        let chat = OpenAiChat::new(&config.llm.api_url, config.llm.timeout)?;
        let extractors = Extractors::from_config(&config.extraction);
        Ok(Self::with_parts(config, Arc::new(chat), extractors))
    }

    pub fn with_parts(config: Config, chat: Arc<dyn ChatCompletion>, extractors: Extractors) -> Self {
        AppState {
            sessions: Arc::new(SessionStore::new(config.session_ttl)),
            analyzer: Analyzer::new(chat, config.llm.clone()),
            extractors,
            config: Arc::new(config),
        }
    }
}
