// ============================================================================
// Edge Gateway
// ============================================================================
//
// Sits in front of the object store. Every public request must carry a
// capability minted by the origin:
//
//   GET /user_files/42.png?verify=<token>&content-disposition=<directive>
//
// The gateway verifies the token statelessly (HMAC with the shared secret,
// bound IP, expiry), then streams the object from the store. A second
// listener serves health checks and Prometheus metrics.
//
// Known limitation: IP binding is a soft guarantee. Users behind shared NAT,
// proxies or VPNs share an IP, and a user whose IP changes mid-session gets
// 401 until a fresh URL is minted.
//
// ============================================================================

pub mod client_ip;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod proxy;
pub mod rate_limiter;
pub mod state;
pub mod verification;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use state::GatewayState;

/// Public listener: every path is treated as an object key
pub fn create_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .fallback(handlers::deliver)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Internal listener for health checks and metrics scraping
pub fn create_health_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state)
}
