use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;

use crate::analysis::Credential;
use crate::config::LlmConfig;
use crate::error::{Result, AppError};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn single_turn(settings: &LlmConfig, system: &str, user: String) -> Self {
        ChatRequest {
            model: settings.model.clone(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user,
                },
            ],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// One chat-completion round trip. The only network seam of the pipeline.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, credential: &Credential, request: &ChatRequest) -> Result<String>;
}

pub struct OpenAiChat {
    client: Client,
    api_url: String,
}

impl OpenAiChat {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(OpenAiChat {
            client,
            api_url: api_url.to_string(),
        })
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChat {
    async fn complete(&self, credential: &Credential, request: &ChatRequest) -> Result<String> {
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(credential.expose())
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = res.json().await?;
        extract_reply(&json)
    }
}

fn extract_reply(json: &serde_json::Value) -> Result<String> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| AppError::UpstreamFailure("Invalid response format from LLM".to_string()))?;
    if reply.trim().is_empty() {
        return Err(AppError::UpstreamFailure("LLM returned an empty answer".to_string()));
    }
    Ok(reply.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;
    use tokio::net::TcpListener;

    const KEY: &str = "sk-test-0123456789abcdef";

    /// Serves one canned answer for every POST and returns its URL.
    async fn upstream(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route("/v1/chat/completions", post(move || async move { (status, body) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    async fn call(url: &str) -> Result<String> {
        let chat = OpenAiChat::new(url, Duration::from_secs(5)).unwrap();
        let credential = Credential::parse(Some(KEY)).unwrap();
        let request = ChatRequest::single_turn(&LlmConfig::default(), "sys", "report".to_string());
        chat.complete(&credential, &request).await
    }

    #[tokio::test]
    async fn client_reads_successful_answer() {
        let url = upstream(
            StatusCode::OK,
            r#"{"choices":[{"message":{"role":"assistant","content":"SUMMARY\nAll fine"}}]}"#,
        )
        .await;
        assert_eq!(call(&url).await.unwrap(), "SUMMARY\nAll fine");
    }

    #[tokio::test]
    async fn non_success_status_keeps_status_and_body() {
        let url = upstream(StatusCode::TOO_MANY_REQUESTS, "quota exceeded for this key").await;
        let err = call(&url).await.unwrap_err();
        let AppError::UpstreamFailure(message) = &err else {
            panic!("expected an upstream failure, got {:?}", err);
        };
        assert!(message.contains("429"));
        assert!(message.contains("quota exceeded for this key"));
    }

    #[tokio::test]
    async fn answer_without_choices_is_upstream_failure() {
        let url = upstream(StatusCode::OK, r#"{"id":"chatcmpl-1","object":"chat.completion"}"#).await;
        let err = call(&url).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure(ref message) if message.contains("Invalid response format")));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_upstream_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = call(&format!("http://{}/v1/chat/completions", addr)).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure(_)));
    }

    #[test]
    fn request_body_shape() {
        let request = ChatRequest::single_turn(&LlmConfig::default(), "sys", "user text".to_string());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn reply_is_read_from_first_choice() {
        let json = json!({"choices": [{"message": {"role": "assistant", "content": "SUMMARY\nok"}}]});
        assert_eq!(extract_reply(&json).unwrap(), "SUMMARY\nok");
    }

    #[test]
    fn malformed_or_empty_reply_is_upstream_failure() {
        assert!(matches!(extract_reply(&json!({"error": "x"})), Err(AppError::UpstreamFailure(_))));
        let empty = json!({"choices": [{"message": {"content": "  "}}]});
        assert!(matches!(extract_reply(&empty), Err(AppError::UpstreamFailure(_))));
    }
}
