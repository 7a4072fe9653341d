use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not extract text from the uploaded file: {0}")]
    ExtractionFailure(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMedia(String),

    #[error("Please enter your API key before analyzing a report")]
    MissingCredential,

    #[error("The API key looks malformed")]
    MalformedCredential,

    #[error("No report text to analyze")]
    EmptyInput,

    #[error("Analysis request failed: {0}")]
    UpstreamFailure(String),

    #[error("Could not render the report: {0}")]
    RenderingFailure(String),

    #[error("Unknown session: {0}")]
    SessionNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request processing timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ExtractionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::MissingCredential | AppError::MalformedCredential => StatusCode::UNAUTHORIZED,
            AppError::EmptyInput | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::RenderingFailure(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        response::error::<()>(status, self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamFailure(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid upload: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
