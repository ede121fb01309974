// ============================================================================
// Rate Limit Configuration
// ============================================================================

use anyhow::Result;

use super::constants::*;

/// Where rate-limit counters live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Shared counters in Redis (multi-instance deployments)
    Redis,
    /// Process-local counters (single instance, development, tests)
    Memory,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub backend: RateLimitBackend,
    /// Requests allowed per key within one window
    pub max_requests: u32,
    pub window_secs: u64,
    pub redis_url: Option<String>,
    /// Prefix for Redis counter keys: "rate:edge:{ip}-{host}"
    pub key_prefix: String,
}

impl RateLimitConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let backend = match std::env::var("RATE_LIMIT_BACKEND")
            .unwrap_or_else(|_| "redis".to_string())
            .to_lowercase()
            .as_str()
        {
            "redis" => RateLimitBackend::Redis,
            "memory" => RateLimitBackend::Memory,
            other => anyhow::bail!("Unknown RATE_LIMIT_BACKEND: {} (expected redis or memory)", other),
        };

        let redis_url = std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty());
        if backend == RateLimitBackend::Redis && redis_url.is_none() {
            anyhow::bail!("REDIS_URL must be set when RATE_LIMIT_BACKEND=redis");
        }

        Ok(Self {
            backend,
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|w: &u64| *w > 0)
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            redis_url,
            key_prefix: std::env::var("REDIS_KEY_PREFIX_RATE")
                .unwrap_or_else(|_| DEFAULT_RATE_KEY_PREFIX.to_string()),
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::Memory,
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            redis_url: None,
            key_prefix: DEFAULT_RATE_KEY_PREFIX.to_string(),
        }
    }
}
