//! LLM Client — the single point of entry for chat-completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the completion endpoint directly.
//! This layer performs exactly one HTTP exchange per call. Retries live in
//! `backoff`, content interpretation lives in `generation::extractor`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod backoff;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(test)]
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// JSON body of `POST {endpoint}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// One fully-addressed completion call: where, with which key, and what.
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub url: String,
    pub api_key: String,
    pub body: ChatCompletionBody,
}

/// The upstream reply exactly as received. Non-2xx statuses are data here, not errors.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorEnvelope {
    error: UpstreamErrorBody,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Raw `Retry-After` header value, if the upstream sent one.
    pub fn retry_after(&self) -> Option<&str> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
    }

    /// `choices[0].message.content`, or `None` when the body is not a completion.
    pub fn completion_text(&self) -> Option<String> {
        let envelope: CompletionEnvelope = serde_json::from_str(&self.body).ok()?;
        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
    }

    /// `error.message` from an OpenAI-style error body.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_str::<UpstreamErrorEnvelope>(&self.body)
            .ok()
            .and_then(|e| e.error.message)
            .filter(|m| !m.trim().is_empty())
    }

    /// Short human-readable summary, e.g. `HTTP 429 Too Many Requests: slow down`.
    pub fn status_summary(&self) -> String {
        let mut summary = format!("HTTP {}", self.status.as_u16());
        if let Some(reason) = self.status.canonical_reason() {
            summary.push(' ');
            summary.push_str(reason);
        }
        if let Some(message) = self.error_message() {
            summary.push_str(": ");
            summary.push_str(&message);
        }
        summary
    }
}

/// The seam between the backoff controller and the network.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Performs one call. Only transport-level failures are `Err`.
    async fn send(&self, request: &ChatCompletionRequest) -> Result<UpstreamResponse, LlmError>;
}

/// `reqwest`-backed transport with a per-attempt timeout.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
}

impl LlmClient {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CompletionTransport for LlmClient {
    async fn send(&self, request: &ChatCompletionRequest) -> Result<UpstreamResponse, LlmError> {
        let response = self
            .client
            .post(&request.url)
            .bearer_auth(&request.api_key)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(
            "Completion call returned {} ({} bytes)",
            status,
            body.len()
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response(status: u16, body: &str) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn request_for(server: &MockServer) -> ChatCompletionRequest {
        ChatCompletionRequest {
            url: format!("{}/chat/completions", server.uri()),
            api_key: "sk-test".to_string(),
            body: ChatCompletionBody {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.5,
                messages: vec![ChatMessage::system("sys"), ChatMessage::user("usr")],
            },
        }
    }

    #[test]
    fn test_completion_text_reads_first_choice() {
        let r = response(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}},{"message":{"content":"second"}}]}"#,
        );
        assert_eq!(r.completion_text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_completion_text_none_for_non_completion_body() {
        assert!(response(200, "not json").completion_text().is_none());
        assert!(response(200, r#"{"choices":[]}"#).completion_text().is_none());
    }

    #[test]
    fn test_status_summary_includes_upstream_message() {
        let r = response(401, r#"{"error":{"message":"Incorrect API key provided"}}"#);
        assert_eq!(
            r.status_summary(),
            "HTTP 401 Unauthorized: Incorrect API key provided"
        );
        assert_eq!(response(503, "").status_summary(), "HTTP 503 Service Unavailable");
    }

    #[test]
    fn test_retry_after_header_lookup() {
        let mut r = response(429, "");
        assert!(r.retry_after().is_none());
        r.headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(r.retry_after(), Some("3"));
    }

    #[tokio::test]
    async fn test_send_posts_bearer_authenticated_chat_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.5,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "[]"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(Duration::from_secs(5)).unwrap();
        let response = client.send(&request_for(&server)).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.completion_text().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_send_returns_non_2xx_without_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = LlmClient::new(Duration::from_secs(5)).unwrap();
        let response = client.send(&request_for(&server)).await.unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body, "boom");
    }

    #[tokio::test]
    async fn test_send_times_out_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = LlmClient::new(Duration::from_millis(50)).unwrap();
        let result = client.send(&request_for(&server)).await;

        assert!(matches!(result, Err(LlmError::Http(_))));
    }
}
