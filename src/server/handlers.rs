use std::convert::Infallible;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, error, info};

use super::AppState;
use crate::ai::provider::CircuitState;
use crate::types::{GenerationRequest, PolicyError};

/// Error answered to HTTP callers as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        let status = match &err {
            PolicyError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PolicyError::FrameworkNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub(super) async fn generate_policy(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!(framework = %request.framework_id, policy_type = %request.policy_type, "POST /generate-policy");
    let result = state.orchestrator.generate(&request).await?;
    Ok(Json(result).into_response())
}

pub(super) async fn generate_policy_stream(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!(framework = %request.framework_id, policy_type = %request.policy_type, "POST /generate-policy/stream");
    let chunks = state.orchestrator.generate_stream(request)?;

    let events = chunks.map(|chunk| {
        let event = Event::default().event(chunk.kind.as_str());
        let event = match serde_json::to_string(&chunk) {
            Ok(data) => event.data(data),
            Err(e) => {
                debug!("Failed to encode chunk: {}", e);
                event.data(json!({ "type": "error", "content": e.to_string() }).to_string())
            }
        };
        Ok::<Event, Infallible>(event)
    });

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("GET /health");
    let providers = state.orchestrator.provider_health();
    let status = if providers.iter().all(|p| p.state == CircuitState::Open) {
        "unavailable"
    } else if providers.iter().any(|p| p.state != CircuitState::Closed) {
        "degraded"
    } else {
        "ok"
    };

    Json(json!({
        "status": status,
        "providers": providers,
        "cache": state.orchestrator.cache().stats(),
    }))
}
