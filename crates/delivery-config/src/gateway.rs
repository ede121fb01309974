// ============================================================================
// Gateway Configuration
// ============================================================================

use anyhow::{Context, Result};
use url::Url;

use super::constants::*;

/// Settings for the edge gateway that verifies capabilities and proxies to
/// the object store
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub port: u16,
    /// Port for /health and /metrics, kept off the public object namespace
    pub health_port: u16,
    /// Scheme + host (+ port) of the real object store
    pub upstream_url: Url,
    /// Reject tokens whose bound IP differs from the connecting IP.
    /// Disabled only for local development.
    pub strict_ip_binding: bool,
    /// Header set by the trusted reverse proxy carrying the client IP
    pub client_ip_header: String,
    pub upstream_connect_timeout_secs: u64,
}

impl GatewayConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let upstream_raw = std::env::var("GATEWAY_UPSTREAM_URL")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());

        Ok(Self {
            port: std::env::var("GATEWAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_GATEWAY_PORT),
            health_port: std::env::var("GATEWAY_HEALTH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HEALTH_PORT),
            upstream_url: parse_upstream_url(&upstream_raw)?,
            strict_ip_binding: std::env::var("GATEWAY_STRICT_IP_BINDING")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            client_ip_header: std::env::var("GATEWAY_CLIENT_IP_HEADER")
                .map(|h| h.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_CLIENT_IP_HEADER.to_string()),
            upstream_connect_timeout_secs: std::env::var("GATEWAY_UPSTREAM_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS),
        })
    }

    /// Host component of the upstream, used to give each backing store its
    /// own rate-limit budget
    pub fn upstream_host(&self) -> &str {
        self.upstream_url.host_str().unwrap_or("unknown")
    }
}

/// Parse and validate the upstream base URL
pub fn parse_upstream_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .with_context(|| format!("GATEWAY_UPSTREAM_URL is not a valid URL: {}", raw))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("GATEWAY_UPSTREAM_URL must use http or https, got {}", url.scheme());
    }
    if url.host_str().is_none() {
        anyhow::bail!("GATEWAY_UPSTREAM_URL must include a host");
    }

    Ok(url)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_GATEWAY_PORT,
            health_port: DEFAULT_HEALTH_PORT,
            upstream_url: Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid"),
            strict_ip_binding: true,
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
            upstream_connect_timeout_secs: DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS,
        }
    }
}
