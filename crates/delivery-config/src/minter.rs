// ============================================================================
// Minter Configuration
// ============================================================================

use super::constants::*;

/// Settings for the origin-side capability minter
#[derive(Clone, Debug)]
pub struct MinterConfig {
    /// Public base URL of the edge gateway (e.g., "https://edge.example.net")
    pub edge_base_url: String,
    /// Fixed IP bound into every token instead of the detected one.
    /// Local development sits behind NAT and only ever sees 127.0.0.1.
    pub dev_ip: Option<String>,
    pub upload_ttl_secs: i64,
    pub view_ttl_secs: i64,
    pub download_ttl_secs: i64,
    pub archive_ttl_secs: i64,
}

impl MinterConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            edge_base_url: std::env::var("MINTER_EDGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_EDGE_BASE_URL.to_string()),
            dev_ip: std::env::var("MINTER_DEV_IP")
                .ok()
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty()),
            upload_ttl_secs: std::env::var("MINTER_UPLOAD_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_UPLOAD_TTL_SECS),
            view_ttl_secs: std::env::var("MINTER_VIEW_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_VIEW_TTL_SECS),
            download_ttl_secs: std::env::var("MINTER_DOWNLOAD_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DOWNLOAD_TTL_SECS),
            archive_ttl_secs: std::env::var("MINTER_ARCHIVE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ARCHIVE_TTL_SECS),
        }
    }
}

impl Default for MinterConfig {
    fn default() -> Self {
        Self {
            edge_base_url: DEFAULT_EDGE_BASE_URL.to_string(),
            dev_ip: None,
            upload_ttl_secs: DEFAULT_UPLOAD_TTL_SECS,
            view_ttl_secs: DEFAULT_VIEW_TTL_SECS,
            download_ttl_secs: DEFAULT_DOWNLOAD_TTL_SECS,
            archive_ttl_secs: DEFAULT_ARCHIVE_TTL_SECS,
        }
    }
}
