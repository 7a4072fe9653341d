use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};
use crate::format::PreamblePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    /// Overall deadline for a single handler, extraction through rendering.
    pub handler_timeout: Duration,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub preamble: PreamblePolicy,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub tesseract_bin: String,
    pub pdftoppm_bin: String,
    pub ocr_languages: String,
    pub page_markers: bool,
    pub ocr_fallback: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            tesseract_bin: "tesseract".to_string(),
            pdftoppm_bin: "pdftoppm".to_string(),
            ocr_languages: "eng+hin".to_string(),
            page_markers: true,
            ocr_fallback: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            llm: LlmConfig::default(),
            extraction: ExtractionConfig::default(),
            handler_timeout: Duration::from_secs(180),
            max_upload_bytes: 20 * 1024 * 1024,
            session_ttl: Duration::from_secs(60 * 60),
            preamble: PreamblePolicy::Drop,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source, falling back to defaults
    /// for keys the source does not have.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let llm = LlmConfig {
            api_url: lookup("OPENAI_API_URL").unwrap_or(defaults.llm.api_url),
            model: lookup("OPENAI_MODEL").unwrap_or(defaults.llm.model),
            max_tokens: parse_or(&lookup, "OPENAI_MAX_TOKENS", defaults.llm.max_tokens)?,
            temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", defaults.llm.temperature)?,
            timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", defaults.llm.timeout.as_secs())?),
        };

        let extraction = ExtractionConfig {
            tesseract_bin: lookup("TESSERACT_BIN").unwrap_or(defaults.extraction.tesseract_bin),
            pdftoppm_bin: lookup("PDFTOPPM_BIN").unwrap_or(defaults.extraction.pdftoppm_bin),
            ocr_languages: lookup("OCR_LANGUAGES").unwrap_or(defaults.extraction.ocr_languages),
            page_markers: parse_or(&lookup, "PDF_PAGE_MARKERS", defaults.extraction.page_markers)?,
            ocr_fallback: parse_or(&lookup, "PDF_OCR_FALLBACK", defaults.extraction.ocr_fallback)?,
        };

        let preamble = match lookup("REPORT_PREAMBLE") {
            Some(value) => value.parse::<PreamblePolicy>()?,
            None => defaults.preamble,
        };

        let ttl_minutes: u64 = parse_or(&lookup, "SESSION_TTL_MINUTES", defaults.session_ttl.as_secs() / 60)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            llm,
            extraction,
            handler_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HANDLER_TIMEOUT_SECS",
                defaults.handler_timeout.as_secs(),
            )?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            session_ttl: Duration::from_secs(ttl_minutes * 60),
            preamble,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
