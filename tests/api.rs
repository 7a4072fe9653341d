use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use health_report_analyzer::analysis::Credential;
use health_report_analyzer::api::routes::create_router;
use health_report_analyzer::config::Config;
use health_report_analyzer::error::{AppError, Result};
use health_report_analyzer::extract::{Extraction, Extractors, TextExtractor};
use health_report_analyzer::llm::{ChatCompletion, ChatRequest};
use health_report_analyzer::AppState;

const VALID_KEY: &str = "sk-integration-0123456789";
const BOUNDARY: &str = "----report-boundary";

const MODEL_ANSWER: &str = "\
1. **SUMMARY**
Most values are within range.
2. **KEY FINDINGS**
- LDL 160 mg/dL (HIGH)
3. **HEALTH STATUS**
Good overall.
4. **LIFESTYLE RECOMMENDATIONS**
- Sleep 7-8 hours
5. **DIETARY SUGGESTIONS**
- Reduce sodium to 1500 mg daily
6. **EXERCISE RECOMMENDATIONS**
- Walk 30 minutes
7. **FOLLOW-UP ACTIONS**
Repeat the lipid profile in 3 months.
8. **PREVENTIVE MEASURES**
Annual checkups are RECOMMENDED.
";

struct FakeChat {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, _credential: &Credential, _request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::UpstreamFailure("HTTP 429 Too Many Requests: quota".to_string()));
        }
        Ok(MODEL_ANSWER.to_string())
    }
}

struct FakeExtractor(&'static str);

#[async_trait]
impl TextExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn extract(&self, _bytes: &[u8]) -> Result<Extraction> {
        Ok(Extraction {
            text: self.0.to_string(),
            page_count: Some(2),
        })
    }
}

struct TestApp {
    router: Router,
    chat: Arc<FakeChat>,
}

fn app_with(fail: bool) -> TestApp {
    let chat = Arc::new(FakeChat {
        calls: AtomicUsize::new(0),
        fail,
    });
    let extractors = Extractors {
        image: Arc::new(FakeExtractor("Hemoglobin 13.5 g/dL")),
        pdf: Arc::new(FakeExtractor("LDL 160 mg/dL")),
    };
    let state = AppState::with_parts(Config::default(), chat.clone(), extractors);
    TestApp {
        router: create_router(state),
        chat,
    }
}

fn app() -> TestApp {
    app_with(false)
}

impl TestApp {
    fn calls(&self) -> usize {
        self.chat.calls.load(Ordering::SeqCst)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn session(&self, api_key: &str, preview: bool) -> String {
        let (status, body) = self
            .json(json_request("POST", "/api/sessions", None, json!({ "api_key": api_key, "preview": preview })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["session_id"].as_str().unwrap().to_string()
    }
}

fn json_request(method: &str, uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session {
        builder = builder.header("x-session-id", id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn multipart_request(uri: &str, session: Option<&str>, file: (&str, &str, &[u8]), fields: &[(&str, &str)]) -> Request<Body> {
    form_request(uri, session, Some(file), fields)
}

fn form_request(
    uri: &str,
    session: Option<&str>,
    file: Option<(&str, &str, &[u8])>,
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(id) = session {
        builder = builder.header("x-session-id", id);
    }
    builder.body(Body::from(body)).unwrap()
}

const PDF_FILE: (&str, &str, &[u8]) = ("report.pdf", "application/pdf", b"%PDF-1.4 fake");

#[tokio::test]
async fn index_page_serves_the_form() {
    let app = app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("Health Checkup Analyzer"));
    assert!(page.contains("/api/analyze"));
}

#[tokio::test]
async fn health_probe() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.json(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn session_response_never_echoes_the_key() {
    let app = app();
    let (status, _, body) = app
        .send(json_request("POST", "/api/sessions", None, json!({ "api_key": VALID_KEY })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let text = String::from_utf8(body).unwrap();
    assert!(!text.contains(VALID_KEY));
    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["data"]["has_credential"], true);
    assert_eq!(json["data"]["preview_requested"], false);
}

#[tokio::test]
async fn session_can_be_updated_and_ended() {
    let app = app();
    let id = app.session("", false).await;

    let (status, body) = app
        .json(json_request("PUT", &format!("/api/sessions/{id}"), None, json!({ "api_key": VALID_KEY, "preview": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_credential"], true);
    assert_eq!(body["data"]["preview_requested"], true);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .json(json_request("POST", "/api/analyze/text", Some(&id), json!({ "text": "Hb 13" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["meta"]["status"], "error");
}

#[tokio::test]
async fn analysis_without_session_is_missing_credential() {
    let app = app();
    let (status, body) = app
        .json(json_request("POST", "/api/analyze/text", None, json!({ "text": "Hb 13" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["meta"]["message"].as_str().unwrap().contains("API key"));
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn malformed_key_makes_no_upstream_call() {
    let app = app();
    let id = app.session("pk-not-a-valid-key-at-all", false).await;
    let (status, body) = app
        .json(json_request("POST", "/api/analyze/text", Some(&id), json!({ "text": "Hb 13" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["meta"]["message"], "The API key looks malformed");
    assert_eq!(app.calls(), 0);

    let (status, _, _) = app
        .send(multipart_request("/api/analyze", Some(&id), PDF_FILE, &[]))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn empty_text_makes_no_upstream_call() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, _) = app
        .json(json_request("POST", "/api/analyze/text", Some(&id), json!({ "text": "   \n" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn text_analysis_returns_sections() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, body) = app
        .json(json_request(
            "POST",
            "/api/analyze/text",
            Some(&id),
            json!({ "text": "Glucose 95 mg/dL", "language": "Hinglish" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.calls(), 1);

    let data = &body["data"];
    assert_eq!(data["target_language"], "Hinglish");
    assert_eq!(data["source_length"], 16);
    let keys: Vec<&str> = data["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec![
            "SUMMARY",
            "KEY FINDINGS",
            "HEALTH STATUS",
            "LIFESTYLE RECOMMENDATIONS",
            "DIETARY SUGGESTIONS",
            "EXERCISE RECOMMENDATIONS",
            "FOLLOW-UP ACTIONS",
            "PREVENTIVE MEASURES",
        ]
    );
    assert_eq!(data["sections"][1]["category"], "findings");
    assert!(data["report_html"].as_str().unwrap().contains("<span class=\"value\">1500 mg</span>"));
}

#[tokio::test]
async fn unsupported_language_is_bad_request() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, _) = app
        .json(json_request("POST", "/api/analyze/text", Some(&id), json!({ "text": "Hb", "language": "Klingon" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn upload_downloads_html_report() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, headers, body) = app
        .send(multipart_request(
            "/api/analyze",
            Some(&id),
            ("scan.png", "image/png", b"\x89PNG\r\n\x1a\nfake"),
            &[("language", "English"), ("patient_name", "Asha Rao"), ("format", "html")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.calls(), 1);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"health_analysis_Asha_Rao_"));
    assert!(disposition.ends_with(".html\""));

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("window.print()"));
    assert!(html.contains("<dd>Asha Rao</dd>"));
    assert!(html.contains("<dd>2</dd>"));
    assert!(html.contains("section-prevention"));
}

#[tokio::test]
async fn upload_downloads_pdf_report() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, headers, body) = app
        .send(multipart_request("/api/analyze", Some(&id), PDF_FILE, &[("format", "pdf")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().contains("health_analysis_Patient_"));
    assert!(body.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let app = app_with(true);
    let id = app.session(VALID_KEY, false).await;
    let (status, body) = app
        .json(json_request("POST", "/api/analyze/text", Some(&id), json!({ "text": "Hb 13" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["meta"]["message"].as_str().unwrap().contains("429"));
    assert_eq!(app.calls(), 1);
}

#[tokio::test]
async fn extract_previews_text_only_when_requested() {
    let app = app();
    let id = app.session(VALID_KEY, true).await;
    let (status, body) = app
        .json(multipart_request("/api/extract", Some(&id), PDF_FILE, &[]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["media_kind"], "pdf");
    assert_eq!(body["data"]["page_count"], 2);
    assert_eq!(body["data"]["extracted_text"], "LDL 160 mg/dL");

    let (status, body) = app
        .json(multipart_request("/api/extract", None, PDF_FILE, &[]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text_length"], 13);
    assert!(body["data"].get("extracted_text").is_none());
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let app = app();
    let (status, body) = app
        .json(multipart_request("/api/extract", None, ("notes.txt", "text/plain", b"hello"), &[]))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["meta"]["status_code"], 415);
}

#[tokio::test]
async fn unknown_session_header_is_not_found() {
    let app = app();
    let (status, _) = app
        .json(json_request(
            "POST",
            "/api/analyze/text",
            Some("6f1c2a4e-1b7d-4c8e-9a55-0d3e2f7b9c10"),
            json!({ "text": "Hb 13" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(json_request("POST", "/api/analyze/text", Some("not-a-uuid"), json!({ "text": "Hb 13" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn previewed_text_is_analyzed_without_a_file() {
    let app = app();
    let id = app.session(VALID_KEY, true).await;
    let (status, headers, body) = app
        .send(form_request(
            "/api/analyze",
            Some(&id),
            None,
            &[("text", "Glucose 95 mg/dL"), ("page_count", "3"), ("language", "Hindi")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.calls(), 1);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<html lang=\"hi\">"));
    assert!(html.contains("<dd>3</dd>"));
    assert!(html.contains("<dd>16</dd>"));
}

#[tokio::test]
async fn previewed_text_still_needs_a_valid_key() {
    let app = app();
    let id = app.session("sk-short", true).await;
    let (status, _) = app
        .json(form_request("/api/analyze", Some(&id), None, &[("text", "Glucose 95 mg/dL")]))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.calls(), 0);
}

#[tokio::test]
async fn upload_without_file_or_text_is_bad_request() {
    let app = app();
    let id = app.session(VALID_KEY, false).await;
    let (status, body) = app
        .json(form_request("/api/analyze", Some(&id), None, &[("text", "  "), ("format", "pdf")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["meta"]["message"].as_str().unwrap().contains("file"));
    assert_eq!(app.calls(), 0);
}
