// ============================================================================
// Capability Verification
// ============================================================================
//
// Stateless check of the `verify` query parameter against the request path.
// Order is fixed:
//
//   parse (5 fields) -> MAC (constant time) -> bound IP -> expiry
//
// The IP check runs after the MAC so that a forged token is rejected the same
// way regardless of where it is replayed from.
//
// The canonical form is re-implemented here rather than shared with the
// minter crate. Both sides are pinned by testdata/capability_vectors.json.
//
// ============================================================================

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use delivery_config::SharedSecret;
use delivery_error::{AppError, AppResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::client_ip::same_ip;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_FIELDS: usize = 5;

/// Fields of a parsed, not yet verified, `verify` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityToken<'a> {
    pub subject_id: &'a str,
    pub client_ip: &'a str,
    pub issued_at: i64,
    pub expires_at: i64,
    pub mac: Vec<u8>,
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCapability {
    /// Empty for anonymous grants
    pub subject_id: String,
    pub client_ip: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Split a raw token into its five fields
///
/// `subjectId-clientIp-issuedAt-expiresAt-base64(mac)`
pub fn parse_token(raw: &str) -> AppResult<CapabilityToken<'_>> {
    let fields: Vec<&str> = raw.split('-').collect();
    if fields.len() != TOKEN_FIELDS {
        return Err(AppError::malformed(format!(
            "expected {} fields, found {}",
            TOKEN_FIELDS,
            fields.len()
        )));
    }

    let issued_at = fields[2]
        .parse::<i64>()
        .map_err(|_| AppError::malformed("issuedAt is not an integer"))?;
    let expires_at = fields[3]
        .parse::<i64>()
        .map_err(|_| AppError::malformed("expiresAt is not an integer"))?;
    let mac = BASE64
        .decode(fields[4])
        .map_err(|_| AppError::malformed("MAC is not valid base64"))?;

    Ok(CapabilityToken {
        subject_id: fields[0],
        client_ip: fields[1],
        issued_at,
        expires_at,
        mac,
    })
}

/// Rebuild the string the minter signed. No separators, fixed order.
pub fn canonical_string(
    resource_path: &str,
    subject_id: &str,
    client_ip: &str,
    issued_at: i64,
    expires_at: i64,
) -> String {
    format!(
        "{}{}{}{}{}",
        resource_path, subject_id, client_ip, issued_at, expires_at
    )
}

fn expected_mac(secret: &SharedSecret, canonical: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Verifies capability tokens with the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SharedSecret,
    strict_ip_binding: bool,
}

impl TokenVerifier {
    pub fn new(secret: SharedSecret, strict_ip_binding: bool) -> Self {
        Self {
            secret,
            strict_ip_binding,
        }
    }

    /// Authorize `raw_token` for `resource_path` (percent-decoded, leading `/`)
    ///
    /// `connecting_ip` is the address reported by the trusted proxy header,
    /// `None` when the header was missing or unparseable. `now` is Unix seconds.
    pub fn verify(
        &self,
        resource_path: &str,
        raw_token: Option<&str>,
        connecting_ip: Option<&str>,
        now: i64,
    ) -> AppResult<VerifiedCapability> {
        let raw_token = raw_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::malformed("verify parameter is missing"))?;
        let token = parse_token(raw_token)?;

        let canonical = canonical_string(
            resource_path,
            token.subject_id,
            token.client_ip,
            token.issued_at,
            token.expires_at,
        );
        let expected = expected_mac(&self.secret, &canonical);

        // Length is public; only the byte comparison has to be constant time
        if !bool::from(expected.as_slice().ct_eq(token.mac.as_slice())) {
            return Err(AppError::ForgedOrTampered);
        }

        let ip_matches = connecting_ip.is_some_and(|ip| same_ip(token.client_ip, ip));
        if self.strict_ip_binding && !ip_matches {
            return Err(AppError::IpMismatch);
        }

        if now >= token.expires_at {
            return Err(AppError::Expired {
                expires_at: token.expires_at,
            });
        }

        Ok(VerifiedCapability {
            subject_id: token.subject_id.to_string(),
            client_ip: token.client_ip.to_string(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        })
    }
}
