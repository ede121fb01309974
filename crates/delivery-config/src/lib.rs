// ============================================================================
// Delivery Config - Centralized configuration management
// ============================================================================
//
// Configuration for both sides of the capability delivery protocol:
// - the minter, embedded in the trusted origin
// - the edge gateway, sitting in front of the object store
//
// Everything is read from the environment once and passed explicitly into
// constructors. Nothing in this workspace reads configuration globally.
//
// ============================================================================

mod constants;
mod gateway;
mod minter;
mod rate_limit;
mod secret;

pub use gateway::{parse_upstream_url, GatewayConfig};
pub use minter::MinterConfig;
pub use rate_limit::{RateLimitBackend, RateLimitConfig};
pub use secret::SharedSecret;

use anyhow::Result;

/// Main configuration structure
#[derive(Clone, Debug)]
pub struct Config {
    /// Shared HMAC key. Optional at load time: the minter refuses to build
    /// without it and the gateway answers 500 until it is set.
    pub hmac_secret: Option<SharedSecret>,
    pub rust_log: String,

    pub minter: MinterConfig,
    pub gateway: GatewayConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            hmac_secret: std::env::var("DELIVERY_HMAC_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SharedSecret::new),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            minter: MinterConfig::from_env(),
            gateway: GatewayConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
        })
    }
}
