// ============================================================================
// Canonicalization
// ============================================================================
//
// Wire format shared with the edge gateway (bit-exact):
//
//   canonical = resourcePath + subjectId + clientIp + issuedAt + expiresAt
//   verify    = subjectId-clientIp-issuedAt-expiresAt-base64(mac)
//
// The gateway re-implements these two functions on its side. There is no
// signature version: changing either format means redeploying both sides
// together. testdata/capability_vectors.json pins the expected output.
//
// ============================================================================

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use delivery_config::SharedSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Field separator in the serialized token
pub const TOKEN_DELIMITER: char = '-';

/// Build the string the MAC is computed over
///
/// Plain concatenation, no separators, fixed order. `resource_path` is the
/// percent-decoded path including its leading `/`.
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

/// HMAC-SHA256 over the UTF-8 bytes of the canonical string
pub fn compute_mac(secret: &SharedSecret, canonical: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Serialize the `verify` query parameter
pub fn serialize_token(
    subject_id: &str,
    client_ip: &str,
    issued_at: i64,
    expires_at: i64,
    mac: &[u8],
) -> String {
    format!(
        "{subject_id}{d}{client_ip}{d}{issued_at}{d}{expires_at}{d}{mac}",
        d = TOKEN_DELIMITER,
        mac = BASE64.encode(mac)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_has_no_separators() {
        let canonical = canonical_string("/user_files/42.png", "7", "203.0.113.5", 1, 2);
        assert_eq!(canonical, "/user_files/42.png7203.0.113.512");
    }

    #[test]
    fn test_anonymous_subject_is_empty() {
        let canonical = canonical_string("/samples/a.txt", "", "203.0.113.5", 10, 20);
        assert_eq!(canonical, "/samples/a.txt203.0.113.51020");

        let token = serialize_token("", "203.0.113.5", 10, 20, &[0u8; 32]);
        assert!(token.starts_with("-203.0.113.5-10-20-"));
    }

    #[test]
    fn test_mac_is_sha256_sized_and_key_dependent() {
        let canonical = canonical_string("/p", "1", "ip", 1, 2);
        let a = compute_mac(&SharedSecret::new("key-a"), &canonical);
        let b = compute_mac(&SharedSecret::new("key-b"), &canonical);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_serialized_token_has_five_fields() {
        let mac = compute_mac(&SharedSecret::new("k"), "anything");
        let token = serialize_token("7", "203.0.113.5", 100, 220, &mac);
        assert_eq!(token.split(TOKEN_DELIMITER).count(), 5);
    }
}
