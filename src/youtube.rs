//! Video search used to attach tutorial links to course chapters.
//!
//! Search never fails the caller: a missing key, a transport error, a non-2xx
//! status or an unreadable body all come back as an empty list.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str) -> Vec<String>;
}

#[derive(Debug, Error)]
enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub struct YoutubeClient {
    client: Client,
    api_key: Option<String>,
    url: String,
    max_results: u32,
}

impl YoutubeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.youtube_api_key.clone(),
            url: config.youtube_search_url.clone(),
            max_results: config.youtube_max_results,
        }
    }

    async fn try_search(&self, api_key: &str, query: &str) -> Result<Vec<String>, SearchError> {
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(watch_urls(parsed))
    }
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    async fn search(&self, query: &str) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };
        match self.try_search(api_key, query).await {
            Ok(urls) => {
                info!(%query, found = urls.len(), "Video search finished");
                urls
            }
            Err(e) => {
                warn!(%query, error = %e, "Video search failed, continuing without videos");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<SearchId>,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

fn watch_urls(resp: SearchResponse) -> Vec<String> {
    resp.items
        .into_iter()
        .filter_map(|item| item.id.and_then(|id| id.video_id))
        .filter(|id| !id.is_empty())
        .map(|id| format!("{WATCH_URL}{id}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{test_config, test_config_with},
        gateway::testing::{closed_url, serve_stub},
    };
    use axum::{extract::Query, routing::get, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn client(url: &str) -> YoutubeClient {
        YoutubeClient::new(&test_config_with(&[
            ("YOUTUBE_API_KEY", "yt-key"),
            ("YOUTUBE_SEARCH_URL", url),
        ]))
    }

    #[test]
    fn builds_watch_urls_and_skips_non_videos() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "items": [
                { "id": { "kind": "youtube#video", "videoId": "iLRZi0Gu8Go" } },
                { "id": { "kind": "youtube#channel", "channelId": "UC123" } },
                { "snippet": {} },
                { "id": { "videoId": "e4fwY9ZsxPw" } },
            ]
        }))
        .unwrap();
        assert_eq!(
            watch_urls(resp),
            vec![
                "https://www.youtube.com/watch?v=iLRZi0Gu8Go".to_string(),
                "https://www.youtube.com/watch?v=e4fwY9ZsxPw".to_string(),
            ]
        );
    }

    #[test]
    fn empty_body_yields_no_urls() {
        let resp: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(watch_urls(resp).is_empty());
    }

    #[tokio::test]
    async fn missing_key_degrades_to_empty_list() {
        let client = YoutubeClient::new(&test_config());
        assert!(client.search("rust ownership tutorial").await.is_empty());
    }

    #[tokio::test]
    async fn search_sends_query_parameters_and_maps_ids() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let expected = [
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", "3"),
                    ("key", "yt-key"),
                    ("q", "rust traits tutorial"),
                ];
                if expected.iter().any(|(k, v)| params.get(*k).map(String::as_str) != Some(*v)) {
                    return Json(json!({ "items": [] }));
                }
                Json(json!({ "items": [{ "id": { "videoId": "abc123" } }, { "id": { "videoId": "def456" } }] }))
            }),
        );
        let base = serve_stub(router).await;

        let urls = client(&format!("{base}/search")).search("rust traits tutorial").await;
        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/watch?v=abc123".to_string(),
                "https://www.youtube.com/watch?v=def456".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn error_status_is_typed_and_degrades_to_empty() {
        let router = Router::new()
            .route("/quota", get(|| async { (axum::http::StatusCode::FORBIDDEN, "quotaExceeded") }))
            .route("/garbage", get(|| async { "not json" }));
        let base = serve_stub(router).await;

        let quota = client(&format!("{base}/quota"));
        match quota.try_search("yt-key", "rust").await {
            Err(SearchError::Status { status, body }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "quotaExceeded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(quota.search("rust").await.is_empty());

        let garbage = client(&format!("{base}/garbage"));
        assert!(matches!(garbage.try_search("yt-key", "rust").await, Err(SearchError::Http(_))));
        assert!(garbage.search("rust").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_search_api_degrades_to_empty() {
        let unreachable = client(&closed_url().await);
        assert!(matches!(unreachable.try_search("yt-key", "rust").await, Err(SearchError::Http(_))));
        assert!(unreachable.search("rust").await.is_empty());
    }
}
