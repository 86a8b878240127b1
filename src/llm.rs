//! Chat-completion transport for the OpenRouter aggregation API.
//!
//! The gateway only sees the [`ChatTransport`] trait; [`OpenRouterClient`] is
//! the production implementation. Timeouts are enforced by the caller.

use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{config::Config, error::GenerationError, sanitize::preview};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl ChatResponse {
    /// Text of the first choice, if it has any non-blank content.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    #[cfg(test)]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice { message: ChoiceMessage { content: Some(content.into()) } }],
            usage: None,
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError>;
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    url: String,
    referer: String,
}

impl OpenRouterClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openrouter_api_key.clone(),
            url: config.openrouter_url.clone(),
            referer: config.app_url.clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError> {
        info!(url = %self.url, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream { status: None, body: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream { status: Some(status.as_u16()), body: e.to_string() })?;

        if !status.is_success() {
            error!(%status, body = %preview(&body, 300), "Chat completion API returned an error");
            return Err(GenerationError::Upstream { status: Some(status.as_u16()), body });
        }

        debug!(body = %preview(&body, 500), "Raw chat completion response");

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| GenerationError::Upstream {
            status: Some(status.as_u16()),
            body: format!("unreadable completion envelope: {e}"),
        })?;

        if let Some(usage) = &parsed.usage {
            info!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "Chat completion usage"
            );
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::test_config_with,
        gateway::testing::{closed_url, serve_stub},
    };
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "x-ai/grok-4.1-fast".into(),
            messages: vec![ChatMessage::user("hello")],
            temperature: Some(0.7),
            max_tokens: None,
            stream: false,
        }
    }

    fn client(url: &str) -> OpenRouterClient {
        OpenRouterClient::new(&test_config_with(&[
            ("OPENROUTER_URL", url),
            ("APP_URL", "https://karigori.test"),
        ]))
    }

    #[test]
    fn request_omits_unset_tuning() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "m",
                "messages": [
                    { "role": "system", "content": "s" },
                    { "role": "user", "content": "u" },
                ],
                "stream": false,
            })
        );
    }

    #[test]
    fn first_content_ignores_blank_and_missing_messages() {
        let resp: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": null } }] })).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "  \n" } }] })).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{}" } }],
            "usage": { "total_tokens": 12 },
        }))
        .unwrap();
        assert_eq!(resp.first_content(), Some("{}"));
    }

    #[tokio::test]
    async fn sends_credentials_and_reads_the_first_choice() {
        let router = Router::new().route(
            "/chat",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
                if header("authorization").as_deref() != Some("Bearer test-key")
                    || header("http-referer").as_deref() != Some("https://karigori.test")
                {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad headers" })));
                }
                let echoed = format!("{} {}", body["model"].as_str().unwrap_or(""), body["stream"]);
                (
                    StatusCode::OK,
                    Json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": echoed } }],
                        "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 },
                    })),
                )
            }),
        );
        let base = serve_stub(router).await;

        let response = client(&format!("{base}/chat")).complete(&request()).await.unwrap();
        assert_eq!(response.first_content(), Some("x-ai/grok-4.1-fast false"));
        assert_eq!(response.usage.and_then(|u| u.total_tokens), Some(5));
    }

    #[tokio::test]
    async fn non_success_status_keeps_status_and_body() {
        let router = Router::new()
            .route("/chat", post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }));
        let base = serve_stub(router).await;

        match client(&format!("{base}/chat")).complete(&request()).await {
            Err(GenerationError::Upstream { status, body }) => {
                assert_eq!(status, Some(429));
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_envelope_is_an_upstream_error() {
        let router = Router::new().route("/chat", post(|| async { "<html>maintenance</html>" }));
        let base = serve_stub(router).await;

        match client(&format!("{base}/chat")).complete(&request()).await {
            Err(GenerationError::Upstream { status, body }) => {
                assert_eq!(status, Some(200));
                assert!(body.starts_with("unreadable completion envelope"), "{body}");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_has_no_status() {
        let err = client(&closed_url().await).complete(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream { status: None, .. }), "{err:?}");
    }
}
