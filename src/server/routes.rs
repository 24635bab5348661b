use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::provider::{GeminiProvider, Provider};

use super::handlers;

/// Provider resolved once at startup.
#[derive(Clone)]
pub enum ProviderSlot {
    Ready(Arc<dyn Provider>),
    /// No usable credential; every invocation fails with this reason.
    Unconfigured(String),
}

/// State shared across all routes.  Immutable after startup.
#[derive(Clone)]
pub struct ProxyState {
    pub provider: ProviderSlot,
}

impl ProxyState {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider: ProviderSlot::Ready(provider),
        }
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            provider: ProviderSlot::Unconfigured(reason.into()),
        }
    }

    /// Validate the credential and build the Gemini provider.  A missing
    /// credential is a deployment defect: it is logged loudly, and the
    /// server keeps answering preflight and health checks while every
    /// invocation reports the configuration error.
    pub fn from_config(config: &Config) -> Self {
        let built = config
            .provider_credential()
            .and_then(|key| GeminiProvider::new(&config.provider, key));

        match built {
            Ok(provider) => {
                info!(provider = provider.name(), "provider ready");
                Self::new(Arc::new(provider))
            }
            Err(e) => {
                error!(kind = e.kind(), "provider unavailable: {e}");
                Self::unconfigured(e.to_string())
            }
        }
    }
}

pub fn build(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ]);

    Router::new()
        .route("/", post(handlers::invoke).options(handlers::preflight))
        .route("/ai-mentor", post(handlers::invoke).options(handlers::preflight))
        .route("/healthz", get(handlers::healthz))
        .layer(cors)
        .with_state(state)
}
