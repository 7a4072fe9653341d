use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post, put},
    Router,
    extract::{DefaultBodyLimit, Json, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analysis::{AnalysisRequest, AnalysisResult, Credential, Language};
use crate::api::models::{
    AnalysisResponse, AnalyzeTextRequest, ExtractResponse, SectionSummary, SessionRequest, SessionResponse,
};
use crate::api::page::INDEX_HTML;
use crate::api::response;
use crate::api::upload::UploadForm;
use crate::document::ReportDocument;
use crate::error::{AppError, Result};
use crate::format::{format_analysis, FormatOptions};
use crate::render::{html, render_report, OutputFormat};
use crate::session::SessionContext;
use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

pub fn create_router(app_state: AppState) -> Router {
    let upload_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", put(update_session).delete(end_session))
        .route("/api/extract", post(extract_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/analyze/text", post(analyze_text_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    response::success(json!({ "status": "ok" }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> impl IntoResponse {
    let session = state.sessions.create(req.into());
    response::with_status(StatusCode::CREATED, SessionResponse::from(&session))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse> {
    let session = state.sessions.update(id, req.into())?;
    Ok(response::success(SessionResponse::from(&session)))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.end(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolves the `x-session-id` header. No header means no session.
fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Option<SessionContext>> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {} header", SESSION_HEADER)))?;
    state.sessions.get(id).map(Some)
}

fn credential_of(session: &Option<SessionContext>) -> Option<&str> {
    session.as_ref().and_then(|s| s.credential.as_deref())
}

/// Runs `work` under the overall handler deadline.
async fn with_deadline<T, F>(limit: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let result = tokio::time::timeout(limit, work).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(result) => {
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "Request processing finished");
            result
        }
        Err(_) => {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Request timed out");
            Err(AppError::Timeout)
        }
    }
}

async fn extract_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let session = session_from_headers(&state, &headers)?;
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let kind = file.media_kind()?;

    let extraction = with_deadline(state.config.handler_timeout, state.extractors.extract(kind, &file.bytes)).await?;
    let preview = session.as_ref().is_some_and(|s| s.preview_requested);

    Ok(response::success(ExtractResponse {
        file_name: file.file_name,
        media_kind: kind,
        size_bytes: file.bytes.len(),
        page_count: extraction.page_count,
        text_length: extraction.text.chars().count(),
        extracted_text: preview.then_some(extraction.text),
    }))
}

async fn analyze_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let session = session_from_headers(&state, &headers)?;
    let form = UploadForm::read(multipart).await?;
    with_deadline(state.config.handler_timeout, process_upload(&state, session, form)).await
}

async fn process_upload(state: &AppState, session: Option<SessionContext>, mut form: UploadForm) -> Result<Response> {
    let language: Language = form.language.as_deref().unwrap_or_default().parse()?;
    let format: OutputFormat = form.format.as_deref().unwrap_or_default().parse()?;
    let patient_name = form.patient_name.take().unwrap_or_default();

    let extraction = match form.take_text() {
        Some(extraction) => {
            tracing::info!(chars = extraction.text.len(), "Using previously extracted text");
            extraction
        }
        None => {
            let file = form.take_file()?;
            let kind = file.media_kind()?;
            // Refuse before spending time on OCR; the analyzer checks again.
            Credential::parse(credential_of(&session))?;
            state.extractors.extract(kind, &file.bytes).await?
        }
    };
    let request = AnalysisRequest::new(extraction.text, language).with_page_count(extraction.page_count);
    let result = state.analyzer.analyze(credential_of(&session), &request).await?;

    let doc = build_document(state, &result, &patient_name);
    let rendered = render_report(&doc, &result.analysis_text, format)?;
    tracing::info!(file_name = %rendered.file_name, sections = doc.sections.len(), "Report ready for download");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, rendered.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", rendered.file_name),
            ),
        ],
        rendered.bytes,
    )
        .into_response())
}

async fn analyze_text_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<impl IntoResponse> {
    let session = session_from_headers(&state, &headers)?;
    let language: Language = req.language.as_deref().unwrap_or_default().parse()?;
    let request = AnalysisRequest::new(req.text, language);

    let result = with_deadline(
        state.config.handler_timeout,
        state.analyzer.analyze(credential_of(&session), &request),
    )
    .await?;

    let doc = build_document(&state, &result, "");
    Ok(response::success(AnalysisResponse {
        sections: doc.sections.iter().map(SectionSummary::from).collect(),
        report_html: html::render_sections(&doc.sections),
        analysis: result,
    }))
}

fn build_document(state: &AppState, result: &AnalysisResult, patient_name: &str) -> ReportDocument {
    let sections = format_analysis(
        &result.analysis_text,
        FormatOptions {
            preamble: state.config.preamble,
        },
    );
    ReportDocument::assemble(result, patient_name, sections)
}
