use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::server::handlers::ErrorEnvelope;

#[derive(Error, Debug)]
pub enum MentorError {
    /// Provider credential missing from the process configuration.
    #[error("{0}")]
    Configuration(String),

    /// Caller sent an unusable body (no prompt, empty prompt, bad JSON).
    #[error("{0}")]
    InvalidRequest(String),

    /// The provider could not be reached or answered with a non-2xx status.
    #[error("{0}")]
    ProviderTransport(String),

    /// The provider answered 2xx but without the expected generated text.
    #[error("{0}")]
    ProviderResponse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MentorError {
    /// Short machine-readable tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MentorError::Configuration(_) => "configuration",
            MentorError::InvalidRequest(_) => "invalid_request",
            MentorError::ProviderTransport(_) => "provider_transport",
            MentorError::ProviderResponse(_) => "provider_response",
            MentorError::Config(_) => "config",
            MentorError::Json(_) => "json",
            MentorError::Io(_) => "io",
        }
    }
}

/// Every failure collapses to the same envelope; only `error` differs.
impl IntoResponse for MentorError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope::new(self.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MentorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::FALLBACK_CONTENT;

    #[test]
    fn runtime_errors_display_bare_message() {
        let e = MentorError::ProviderTransport("Gemini API error: 503".into());
        assert_eq!(e.to_string(), "Gemini API error: 503");
        assert_eq!(e.kind(), "provider_transport");
    }

    #[test]
    fn startup_errors_are_prefixed() {
        let e = MentorError::Config("parse error: bad".into());
        assert_eq!(e.to_string(), "config error: parse error: bad");
    }

    #[tokio::test]
    async fn into_response_is_fallback_envelope() {
        let resp = MentorError::InvalidRequest("Prompt is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], "Prompt is required");
        assert_eq!(v["content"], FALLBACK_CONTENT);
    }
}
