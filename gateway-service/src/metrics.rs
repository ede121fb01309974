//! Prometheus metrics for the edge gateway

use anyhow::Result;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use delivery_error::AppError;
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec,
    TextEncoder,
};

/// Requests by final outcome
pub static DELIVERY_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "delivery_requests_total",
            "Requests handled by the edge gateway, by outcome"
        ),
        &["outcome"]
    )
    .expect("Failed to register DELIVERY_REQUESTS_TOTAL metric")
});

/// Time from sending the upstream request to receiving its headers
pub static UPSTREAM_TIME_TO_HEADERS_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "delivery_upstream_time_to_headers_seconds",
        "Time until the object store answered with response headers"
    )
    .expect("Failed to register UPSTREAM_TIME_TO_HEADERS_SECONDS metric")
});

pub const OUTCOME_AUTHORIZED: &str = "authorized";

/// Outcome label for a rejected or failed request
pub fn outcome_for(error: &AppError) -> &'static str {
    match error {
        AppError::Malformed(_) | AppError::ForgedOrTampered | AppError::IpMismatch => "unverified",
        AppError::Expired { .. } => "expired",
        AppError::RateLimited => "rate_limited",
        AppError::ConfigurationMissing(_) => "misconfigured",
        AppError::Upstream(_) => "upstream_error",
        _ => "internal_error",
    }
}

pub fn record_outcome(outcome: &str) {
    DELIVERY_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Gather all registered metrics and encode as Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

/// GET /metrics
pub async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to gather metrics: {}", e),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_for(&AppError::ForgedOrTampered), "unverified");
        assert_eq!(outcome_for(&AppError::IpMismatch), "unverified");
        assert_eq!(outcome_for(&AppError::Expired { expires_at: 0 }), "expired");
        assert_eq!(outcome_for(&AppError::RateLimited), "rate_limited");
        assert_eq!(
            outcome_for(&AppError::configuration_missing("secret")),
            "misconfigured"
        );
    }

    #[test]
    fn test_gather_metrics() {
        record_outcome(OUTCOME_AUTHORIZED);

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("delivery_requests_total"));
    }
}
