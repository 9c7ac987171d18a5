//! HTTP Surface
//!
//! | Route                          | Response                              |
//! |--------------------------------|---------------------------------------|
//! | `POST /generate-policy`        | JSON `GenerationResult`               |
//! | `POST /generate-policy/stream` | `text/event-stream` of `StreamChunk`s |
//! | `GET /health`                  | Per-provider circuit breaker stats    |
//!
//! Malformed requests are answered with `{"error": ...}`: 422 for invalid
//! fields, 404 for an unknown framework. Provider failures are not HTTP
//! errors; they arrive as `success: false` results or `error` chunks.

mod handlers;

pub use handlers::ApiError;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::info;

use crate::ai::PolicyOrchestrator;
use crate::types::{PolicyError, Result};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: PolicyOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: PolicyOrchestrator) -> Self {
        Self { orchestrator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-policy", post(handlers::generate_policy))
        .route("/generate-policy/stream", post(handlers::generate_policy_stream))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind and serve until the process is interrupted
pub async fn serve(state: AppState, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| PolicyError::Server(format!("Failed to bind {}: {}", bind_address, e)))?;
    info!("policygen listening on http://{}", bind_address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| PolicyError::Server(e.to_string()))
}
