//! HTTP front end: the LINE webhook endpoint and a health check.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::messaging::MessagingError;
use crate::messaging::line::{SIGNATURE_HEADER, WebhookPayload, verify_signature};
use crate::relay::Relay;

/// Default webhook route.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Routing and verification options.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Route LINE posts to.
    pub webhook_path: String,
    /// Channel secret. When set, every webhook must carry a valid signature.
    pub channel_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            webhook_path: DEFAULT_WEBHOOK_PATH.to_owned(),
            channel_secret: None,
        }
    }
}

#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
    channel_secret: Option<Arc<str>>,
}

/// Build the application router.
pub fn router(relay: Relay, config: &ServerConfig) -> Router {
    let path = if config.webhook_path.starts_with('/') {
        config.webhook_path.clone()
    } else {
        format!("/{}", config.webhook_path)
    };

    let state = AppState {
        relay: Arc::new(relay),
        channel_secret: config
            .channel_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Arc::from),
    };

    Router::new()
        .route(&path, post(webhook))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "retrieval": state.relay.has_retriever(),
    }))
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = &state.channel_secret {
        if let Err(e) = check_signature(secret, &headers, &body) {
            warn!(error = %e, "rejecting webhook");
            return rejection(&e).into_response();
        }
    }

    let payload = match WebhookPayload::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "rejecting webhook");
            return rejection(&e).into_response();
        }
    };

    // Per-event failures are already logged; LINE only needs to know the
    // delivery arrived.
    state.relay.handle_payload(&payload).await;
    (StatusCode::OK, "OK").into_response()
}

fn check_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> std::result::Result<(), MessagingError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(MessagingError::MissingSignature)?;
    verify_signature(secret, body, signature)
}

fn rejection(err: &MessagingError) -> (StatusCode, &'static str) {
    match err {
        MessagingError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid signature"),
        MessagingError::MissingSignature => (StatusCode::BAD_REQUEST, "missing signature"),
        _ => (StatusCode::BAD_REQUEST, "invalid payload"),
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
