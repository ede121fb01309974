//! Shared state for the delivery and health routers

use delivery_config::{GatewayConfig, SharedSecret};
use delivery_error::AppResult;
use std::sync::Arc;

use crate::proxy::UpstreamClient;
use crate::rate_limiter::RateLimiter;
use crate::verification::TokenVerifier;

pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    /// `None` when no shared secret is configured. Every delivery request is
    /// then answered with 500 instead of refusing to start.
    pub verifier: Option<TokenVerifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub upstream: UpstreamClient,
}

impl GatewayState {
    pub fn new(
        config: GatewayConfig,
        secret: Option<SharedSecret>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> AppResult<Self> {
        let verifier = secret
            .filter(|s| !s.is_empty())
            .map(|s| TokenVerifier::new(s, config.strict_ip_binding));

        if verifier.is_none() {
            tracing::error!("DELIVERY_HMAC_SECRET is not set, every delivery request will fail");
        }
        if !config.strict_ip_binding {
            tracing::warn!("IP binding is relaxed: tokens are accepted from any client IP");
        }

        let upstream = UpstreamClient::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            verifier,
            rate_limiter,
            upstream,
        })
    }
}
