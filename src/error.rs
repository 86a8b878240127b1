use std::time::Duration;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Startup failures. The process refuses to serve when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    MissingCredential(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// A model response that parsed as JSON but does not have the expected shape.
///
/// `field` is a path such as `testCases`, `chapters[2].lessons[0]` or
/// `quiz[1].answer`; `$` stands for the document root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{field}` {reason}")]
pub struct SchemaViolation {
    pub field: String,
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Request timeout - AI took too long to respond (limit {}s)", .0.as_secs())]
    Timeout(Duration),
    #[error("AI API error ({}): {body}", status_label(.status))]
    Upstream { status: Option<u16>, body: String },
    #[error("AI returned no content in response")]
    EmptyUpstreamResponse,
    #[error("Failed to parse AI response: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("AI response failed validation: {0}")]
    SchemaViolation(#[from] SchemaViolation),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

impl GenerationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. }
            | Self::EmptyUpstreamResponse
            | Self::MalformedJson(_)
            | Self::SchemaViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short stable name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Timeout(_) => "timeout",
            Self::Upstream { .. } => "upstream_error",
            Self::EmptyUpstreamResponse => "empty_upstream_response",
            Self::MalformedJson(_) => "malformed_json",
            Self::SchemaViolation(_) => "schema_violation",
        }
    }
}

/// Failure envelope returned by every endpoint:
/// `{success:false, error, timestamp}` plus `details` in development.
#[derive(Debug)]
pub struct ApiError {
    pub error: GenerationError,
    pub expose_details: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let mut body = json!({
            "success": false,
            "error": self.error.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if self.expose_details {
            body["details"] = json!(format!("{:?}", self.error));
        }
        (status, Json(body)).into_response()
    }
}
