//! Process configuration, read once at startup.
//!
//! Only `OPENROUTER_API_KEY` is mandatory. Everything else has a default, and a
//! missing `YOUTUBE_API_KEY` just leaves chapter video lists empty. Without
//! `AI_GURU_LAB_API` the banner image endpoint answers with an error.

use std::{fmt, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
pub const DEFAULT_IMAGE_URL: &str = "https://aigurulab.tech/api/generate-image";

/// Ordered model list. Only the first entry is ever requested.
pub const FALLBACK_MODELS: &[&str] = &[
    "x-ai/grok-4.1-fast",
    "x-ai/grok-4.1-fast:free",
    "qwen/qwen3-coder:free",
    "z-ai/glm-4.5-air:free",
    "openai/gpt-oss-20b:free",
    "nvidia/nemotron-nano-12b-v2-vl:free",
    "nvidia/nemotron-nano-9b-v2:free",
    "alibaba/tongyi-deepresearch-30b-a3b:free",
    "meituan/longcat-flash-chat:free",
    "kwaipilot/kat-coder-pro:free",
    "cognitivecomputations/dolphin-mistral-24b-venice-edition:free",
    "tngtech/deepseek-r1t2-chimera:free",
    "tngtech/deepseek-r1t-chimera:free",
];

#[derive(Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_url: String,
    pub models: Vec<String>,
    pub youtube_api_key: Option<String>,
    pub youtube_search_url: String,
    pub youtube_max_results: u32,
    pub image_api_key: Option<String>,
    pub image_url: String,
    pub request_timeout: Duration,
    pub video_search_concurrency: usize,
    pub app_url: String,
    pub development: bool,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openrouter_api_key =
            get("OPENROUTER_API_KEY").ok_or(ConfigError::MissingCredential("OPENROUTER_API_KEY"))?;

        let models: Vec<String> = match get("OPENROUTER_MODELS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            None => FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        if models.is_empty() {
            return Err(ConfigError::Invalid {
                key: "OPENROUTER_MODELS",
                value: get("OPENROUTER_MODELS").unwrap_or_default(),
            });
        }

        let timeout_secs: u64 = positive(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            openrouter_api_key,
            openrouter_url: get("OPENROUTER_URL").unwrap_or_else(|| DEFAULT_OPENROUTER_URL.into()),
            models,
            youtube_api_key: get("YOUTUBE_API_KEY"),
            youtube_search_url: get("YOUTUBE_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_SEARCH_URL.into()),
            youtube_max_results: positive(get("YOUTUBE_MAX_RESULTS"), "YOUTUBE_MAX_RESULTS", 3)?,
            image_api_key: get("AI_GURU_LAB_API"),
            image_url: get("IMAGE_GENERATION_URL").unwrap_or_else(|| DEFAULT_IMAGE_URL.into()),
            request_timeout: Duration::from_secs(timeout_secs),
            video_search_concurrency: positive(
                get("VIDEO_SEARCH_CONCURRENCY"),
                "VIDEO_SEARCH_CONCURRENCY",
                1,
            )?,
            app_url: get("APP_URL").unwrap_or_else(|| "https://localhost".into()),
            development: get("APP_ENV")
                .map(|env| env.eq_ignore_ascii_case("development"))
                .unwrap_or(false),
            port: parsed(get("PORT"), "PORT", 3000)?,
        })
    }

    pub fn primary_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or(FALLBACK_MODELS[0])
    }
}

fn parsed<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn positive<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let value = parsed(raw, key, default)?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { key, value: "0".into() })
    }
}

// Hand-written so the credentials never reach a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openrouter_api_key", &"***")
            .field("openrouter_url", &self.openrouter_url)
            .field("models", &self.models)
            .field("youtube_api_key", &self.youtube_api_key.as_ref().map(|_| "***"))
            .field("youtube_search_url", &self.youtube_search_url)
            .field("youtube_max_results", &self.youtube_max_results)
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| "***"))
            .field("image_url", &self.image_url)
            .field("request_timeout", &self.request_timeout)
            .field("video_search_concurrency", &self.video_search_concurrency)
            .field("app_url", &self.app_url)
            .field("development", &self.development)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    test_config_with(&[])
}

/// `OPENROUTER_API_KEY=test-key` plus the given overrides.
#[cfg(test)]
pub(crate) fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    Config::from_lookup(|key| match key {
        "OPENROUTER_API_KEY" => Some("test-key".into()),
        _ => overrides.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()),
    })
    .expect("test config")
}
