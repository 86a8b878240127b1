//! Banner image generation through the AI Guru Lab image API.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    config::Config,
    error::GenerationError,
    models::ImagePrompt,
    sanitize::preview,
};

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the image reference (URL or data URI) produced for `prompt`.
    async fn generate(&self, prompt: &ImagePrompt) -> Result<String, GenerationError>;
}

pub struct AiGuruLabClient {
    client: Client,
    api_key: Option<String>,
    url: String,
}

impl AiGuruLabClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.image_api_key.clone(),
            url: config.image_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image: Option<String>,
}

#[async_trait]
impl ImageGenerator for AiGuruLabClient {
    async fn generate(&self, prompt: &ImagePrompt) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::Upstream {
                status: None,
                body: "image generation is not configured (AI_GURU_LAB_API missing)".into(),
            });
        };

        info!(url = %self.url, model = %prompt.model, "🖼️ Requesting banner image");
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(prompt)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream { status: None, body: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream { status: Some(status.as_u16()), body: e.to_string() })?;
        if !status.is_success() {
            error!(%status, body = %preview(&body, 300), "Image API returned an error");
            return Err(GenerationError::Upstream { status: Some(status.as_u16()), body });
        }

        let parsed: ImageResponse = serde_json::from_str(&body).map_err(|e| GenerationError::Upstream {
            status: Some(status.as_u16()),
            body: format!("unreadable image response: {e}"),
        })?;
        let image = parsed
            .image
            .filter(|image| !image.trim().is_empty())
            .ok_or(GenerationError::EmptyUpstreamResponse)?;
        info!(image = %preview(&image, 60), "✅ Banner image ready");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config_with, gateway::testing::serve_stub};
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn prompt() -> ImagePrompt {
        ImagePrompt {
            input: "A friendly crab".into(),
            width: 1024,
            height: 1024,
            model: "flux".into(),
            aspect_ratio: "16:9".into(),
        }
    }

    fn client(url: &str, key: Option<&str>) -> AiGuruLabClient {
        let mut overrides = vec![("IMAGE_GENERATION_URL", url)];
        if let Some(key) = key {
            overrides.push(("AI_GURU_LAB_API", key));
        }
        AiGuruLabClient::new(&test_config_with(&overrides))
    }

    #[tokio::test]
    async fn forwards_prompt_with_api_key() {
        let router = Router::new().route(
            "/image",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("img-key") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "no key" })));
                }
                let image = format!("https://img.test/{}.png", body["aspectRatio"].as_str().unwrap_or("?"));
                (StatusCode::OK, Json(json!({ "image": image })))
            }),
        );
        let base = serve_stub(router).await;

        let image = client(&format!("{base}/image"), Some("img-key")).generate(&prompt()).await.unwrap();
        assert_eq!(image, "https://img.test/16:9.png");
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let err = client("http://127.0.0.1:9/unused", None).generate(&prompt()).await.unwrap_err();
        match err {
            GenerationError::Upstream { status, body } => {
                assert_eq!(status, None);
                assert!(body.contains("AI_GURU_LAB_API"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_and_empty_image_are_reported() {
        let router = Router::new()
            .route("/down", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
            .route("/blank", post(|| async { Json(json!({ "image": "" })) }));
        let base = serve_stub(router).await;

        match client(&format!("{base}/down"), Some("k")).generate(&prompt()).await {
            Err(GenerationError::Upstream { status, body }) => {
                assert_eq!(status, Some(502));
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert!(matches!(
            client(&format!("{base}/blank"), Some("k")).generate(&prompt()).await,
            Err(GenerationError::EmptyUpstreamResponse)
        ));
    }
}
