use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::routes::{ProviderSlot, ProxyState};
use crate::error::{MentorError, Result};

/// User-facing sentence returned with every failure, whatever the cause.
pub const FALLBACK_CONTENT: &str =
    "I apologize, but I cannot provide a response right now. Please try again later.";

#[derive(Debug, Deserialize)]
pub struct InvocationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Opaque caller bookkeeping, echoed back untouched.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub content: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub content: String,
}

impl ErrorEnvelope {
    pub fn new(error: String) -> Self {
        Self {
            error,
            content: FALLBACK_CONTENT.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

// -- Invocation ----------------------------------------------------------

pub async fn invoke(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Json<InvocationResponse>> {
    match handle(&state, &body).await {
        Ok(resp) => Ok(Json(resp)),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "ai-mentor invocation failed");
            Err(e)
        }
    }
}

/// Credential check, then body decode, then a single provider call.
async fn handle(state: &ProxyState, body: &[u8]) -> Result<InvocationResponse> {
    let provider = match &state.provider {
        ProviderSlot::Ready(p) => p,
        ProviderSlot::Unconfigured(reason) => {
            return Err(MentorError::Configuration(reason.clone()));
        }
    };

    let req: InvocationRequest = serde_json::from_slice(body)
        .map_err(|e| MentorError::InvalidRequest(format!("invalid request body: {e}")))?;

    let prompt = req
        .prompt
        .filter(|p| !p.is_empty())
        .ok_or_else(|| MentorError::InvalidRequest("Prompt is required".into()))?;

    let content = provider.generate(&prompt).await?;

    info!(
        provider = provider.name(),
        prompt_len = prompt.len(),
        response_len = content.len(),
        "ai-mentor invocation succeeded"
    );

    Ok(InvocationResponse {
        content,
        context: req.context.unwrap_or(serde_json::Value::Null),
    })
}

/// Backstop for OPTIONS; the CORS layer normally answers preflight itself.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

// -- Health --------------------------------------------------------------

pub async fn healthz(State(state): State<ProxyState>) -> Json<HealthResponse> {
    let provider = match &state.provider {
        ProviderSlot::Ready(p) => Some(p.name().to_string()),
        ProviderSlot::Unconfigured(_) => None,
    };
    Json(HealthResponse {
        status: "ok",
        configured: provider.is_some(),
        provider,
    })
}
