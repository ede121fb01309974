use axum::{http::StatusCode, response::IntoResponse};
use chrono::{TimeZone, Utc};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Body text shared by every authorization failure.
///
/// Malformed, forged and IP-mismatched tokens must be indistinguishable to
/// the caller, otherwise the response becomes an oracle for probing the
/// protocol one check at a time.
pub const UNVERIFIED_MESSAGE: &str = "Unverified";

/// Application error type for capability delivery
///
/// The specific reason is kept on the variant for server-side logs only.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Authorization Errors =====
    #[error("Malformed capability token: {0}")]
    Malformed(String),

    #[error("Capability MAC does not match")]
    ForgedOrTampered,

    #[error("Connecting IP does not match the IP bound into the capability")]
    IpMismatch,

    #[error("Capability expired at {expires_at}")]
    Expired { expires_at: i64 },

    #[error("Rate limit exceeded")]
    RateLimited,

    // ===== Configuration Errors =====
    #[error("Missing required configuration: {0}")]
    ConfigurationMissing(String),

    // ===== Upstream Errors =====
    #[error("Object store request failed: {0}")]
    Upstream(String),

    // ===== Storage Errors =====
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // ===== Internal Server Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Malformed(_) | AppError::ForgedOrTampered | AppError::IpMismatch => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Expired { .. } => StatusCode::GONE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            #[cfg(feature = "redis")]
            AppError::Redis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-facing message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Malformed(_) | AppError::ForgedOrTampered | AppError::IpMismatch => {
                UNVERIFIED_MESSAGE.to_string()
            }
            AppError::Expired { expires_at } => {
                format!("URL expired at {}", format_instant(*expires_at))
            }
            AppError::RateLimited => "Rate limit exceeded.".to_string(),
            AppError::ConfigurationMissing(_) => "Missing required configuration.".to_string(),
            AppError::Upstream(_) => "Object store unavailable.".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Malformed(_) | AppError::ForgedOrTampered | AppError::IpMismatch => {
                "UNVERIFIED"
            }
            AppError::Expired { .. } => "EXPIRED",
            AppError::RateLimited => "RATE_LIMIT_EXCEEDED",
            AppError::ConfigurationMissing(_) => "CONFIG_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            #[cfg(feature = "redis")]
            AppError::Redis(_) => "REDIS_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %self.error_code(),
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            // The reason is only ever visible here
            tracing::warn!(reason = %self, "Capability rejected");
        } else {
            tracing::debug!(
                error = %self,
                error_code = %self.error_code(),
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();

        let response_body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(response_body)).into_response()
    }
}

/// Render a Unix timestamp as an RFC 3339 instant for expiry messages
fn format_instant(unix_seconds: i64) -> String {
    match Utc.timestamp_opt(unix_seconds, 0).single() {
        Some(instant) => instant.to_rfc3339(),
        None => unix_seconds.to_string(),
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::Malformed(msg.into())
    }

    pub fn configuration_missing(msg: impl Into<String>) -> Self {
        AppError::ConfigurationMissing(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
