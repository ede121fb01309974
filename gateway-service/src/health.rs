use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::state::GatewayState;

/// Liveness: the process is up
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "gateway-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness: requests can actually be verified
pub async fn readiness_check(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    if state.verifier.is_some() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "reason": "shared secret not configured" })),
        )
    }
}
