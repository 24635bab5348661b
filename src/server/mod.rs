pub mod handlers;
pub mod routes;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::Config;
use crate::error::{MentorError, Result};

pub use routes::ProxyState;

pub async fn serve(
    config: &Config,
    state: ProxyState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = routes::build(state);
    let bind = &config.bind;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| MentorError::Config(format!("failed to bind {bind}: {e}")))?;

    info!(bind = %bind, "mentor proxy listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| MentorError::Config(format!("server error: {e}")))?;

    Ok(())
}
