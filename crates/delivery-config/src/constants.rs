// ============================================================================
// Configuration Constants
// ============================================================================

// Default ports
pub(crate) const DEFAULT_GATEWAY_PORT: u16 = 8787;
pub(crate) const DEFAULT_HEALTH_PORT: u16 = 8788;

pub(crate) const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:9000";
pub(crate) const DEFAULT_EDGE_BASE_URL: &str = "http://localhost:8787";

// Header injected by the reverse proxy in front of the gateway.
// Never read the client IP from anything the client controls.
pub(crate) const DEFAULT_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

pub(crate) const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 10;

// Capability TTLs (seconds)
// Uploads are short-lived, archive batches get the longest window since the
// client may take a while to walk through every file.
pub(crate) const DEFAULT_UPLOAD_TTL_SECS: i64 = 30;
pub(crate) const DEFAULT_VIEW_TTL_SECS: i64 = 120;
pub(crate) const DEFAULT_DOWNLOAD_TTL_SECS: i64 = 120;
pub(crate) const DEFAULT_ARCHIVE_TTL_SECS: i64 = 15 * SECONDS_PER_MINUTE;

// Rate limiting
pub(crate) const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 300;
pub(crate) const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub(crate) const DEFAULT_RATE_KEY_PREFIX: &str = "rate:edge:";

pub(crate) const SECONDS_PER_MINUTE: i64 = 60;
