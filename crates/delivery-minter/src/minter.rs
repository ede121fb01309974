// ============================================================================
// Capability Minter
// ============================================================================
//
// Runs inside the trusted origin whenever a caller is granted access to one
// object. Produces a URL pointing at the edge gateway:
//
//   https://<edge>/<path>?verify=<token>&content-disposition=<directive>
//
// Pure function of its inputs, the clock and the shared secret. Nothing is
// stored: a capability dies when `expires_at` passes.
//
// ============================================================================

use chrono::Utc;
use delivery_config::{MinterConfig, SharedSecret};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::{form_urlencoded, Url};

use crate::canonical::{canonical_string, compute_mac, serialize_token, TOKEN_DELIMITER};
use crate::disposition::Disposition;
use crate::error::MintError;

/// Characters escaped when the decoded resource path goes into the URL.
/// '/' stays literal; '%' is escaped so the gateway's decode is lossless.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What the capability is for; selects the TTL preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    Upload,
    View,
    Download,
    /// One of many files fetched for a client-side archive
    Archive,
}

/// Input for a single capability
#[derive(Debug, Clone)]
pub struct MintRequest<'a> {
    /// Percent-decoded path, leading '/' included
    pub resource_path: &'a str,
    /// `None` for anonymous grants (link shares)
    pub subject_id: Option<&'a str>,
    /// IP the origin saw for the caller
    pub client_ip: &'a str,
    pub ttl_secs: i64,
    pub disposition: Disposition,
}

impl<'a> MintRequest<'a> {
    pub fn new(resource_path: &'a str, client_ip: &'a str, ttl_secs: i64) -> Self {
        Self {
            resource_path,
            subject_id: None,
            client_ip,
            ttl_secs,
            disposition: Disposition::Inline { filename: None },
        }
    }

    pub fn subject(mut self, subject_id: Option<&'a str>) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }
}

/// A minted capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityUrl {
    pub url: String,
    /// Value of the `verify` query parameter
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

pub struct Minter {
    secret: SharedSecret,
    edge_base_url: String,
    config: MinterConfig,
}

impl Minter {
    /// Build a minter from explicit configuration
    ///
    /// Fails if the shared secret is absent or empty, or if the edge base URL
    /// is not an absolute http(s) URL.
    pub fn new(config: &MinterConfig, secret: Option<&SharedSecret>) -> Result<Self, MintError> {
        let secret = secret
            .filter(|s| !s.is_empty())
            .cloned()
            .ok_or_else(|| MintError::Configuration("shared HMAC secret is not set".to_string()))?;

        let base = Url::parse(&config.edge_base_url).map_err(|e| {
            MintError::Configuration(format!(
                "invalid edge base URL {:?}: {}",
                config.edge_base_url, e
            ))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(MintError::Configuration(format!(
                "edge base URL must use http or https, got {}",
                base.scheme()
            )));
        }

        if let Some(dev_ip) = &config.dev_ip {
            tracing::info!(dev_ip = %dev_ip, "Minter binds capabilities to a fixed development IP");
        }

        Ok(Self {
            secret,
            edge_base_url: config.edge_base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    /// TTL preset for a kind of grant
    pub fn ttl_for(&self, kind: GrantKind) -> i64 {
        match kind {
            GrantKind::Upload => self.config.upload_ttl_secs,
            GrantKind::View => self.config.view_ttl_secs,
            GrantKind::Download => self.config.download_ttl_secs,
            GrantKind::Archive => self.config.archive_ttl_secs,
        }
    }

    /// Mint a capability issued now
    pub fn mint(&self, request: &MintRequest<'_>) -> Result<CapabilityUrl, MintError> {
        self.mint_at(request, Utc::now().timestamp())
    }

    /// Mint one capability per object for an archive download.
    /// All of them share a single issue time.
    pub fn mint_batch(&self, requests: &[MintRequest<'_>]) -> Result<Vec<CapabilityUrl>, MintError> {
        let issued_at = Utc::now().timestamp();
        requests
            .iter()
            .map(|request| self.mint_at(request, issued_at))
            .collect()
    }

    /// Mint a capability with an explicit issue time
    pub fn mint_at(
        &self,
        request: &MintRequest<'_>,
        issued_at: i64,
    ) -> Result<CapabilityUrl, MintError> {
        if !request.resource_path.starts_with('/') {
            return Err(MintError::InvalidResourcePath(
                request.resource_path.to_string(),
            ));
        }
        if request.ttl_secs <= 0 {
            return Err(MintError::InvalidTtl(request.ttl_secs));
        }

        let subject_id = request.subject_id.unwrap_or("");
        let client_ip = self.config.dev_ip.as_deref().unwrap_or(request.client_ip);

        if subject_id.contains(TOKEN_DELIMITER) {
            return Err(MintError::DelimiterInField { field: "subject id" });
        }
        if client_ip.is_empty() {
            return Err(MintError::MissingClientIp);
        }
        if client_ip.contains(TOKEN_DELIMITER) {
            return Err(MintError::DelimiterInField { field: "client IP" });
        }

        let expires_at = issued_at
            .checked_add(request.ttl_secs)
            .ok_or(MintError::InvalidTtl(request.ttl_secs))?;

        let canonical = canonical_string(
            request.resource_path,
            subject_id,
            client_ip,
            issued_at,
            expires_at,
        );
        let mac = compute_mac(&self.secret, &canonical);
        let token = serialize_token(subject_id, client_ip, issued_at, expires_at, &mac);

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("verify", &token)
            .append_pair("content-disposition", &request.disposition.directive())
            .finish();

        let url = format!(
            "{}{}?{}",
            self.edge_base_url,
            utf8_percent_encode(request.resource_path, PATH_ESCAPE),
            query
        );

        tracing::debug!(
            resource_path = %request.resource_path,
            expires_at = expires_at,
            "Minted capability URL"
        );

        Ok(CapabilityUrl {
            url,
            token,
            issued_at,
            expires_at,
        })
    }
}
