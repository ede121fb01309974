//! Connecting client IP as reported by the trusted reverse proxy
//!
//! Only the one configured header is consulted. `X-Forwarded-For` and similar
//! headers are client-controlled unless the edge overwrites them.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Read and normalize the client IP from `header_name`
///
/// Returns `None` when the header is absent or does not hold a single IP.
pub fn client_ip_from_header(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let raw = headers.get(header_name)?.to_str().ok()?.trim();
    raw.parse::<IpAddr>().ok().map(normalize_ip)
}

/// Whether the IP bound in a token names the connecting address
///
/// The origin may report the caller in any textual form (`::ffff:a.b.c.d`,
/// uppercase or uncompressed IPv6), so both sides are compared as addresses.
/// A bound value that does not parse only matches byte for byte.
pub fn same_ip(bound: &str, connecting: &str) -> bool {
    match (bound.parse::<IpAddr>(), connecting.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => normalize_ip(a) == normalize_ip(b),
        _ => bound == connecting,
    }
}

/// Canonical textual form ("::1", never "[::1]")
fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn test_reads_configured_header() {
        let map = headers("cf-connecting-ip", "203.0.113.5");
        assert_eq!(
            client_ip_from_header(&map, "cf-connecting-ip").as_deref(),
            Some("203.0.113.5")
        );
    }

    #[test]
    fn test_ignores_other_headers() {
        let map = headers("x-forwarded-for", "203.0.113.5");
        assert_eq!(client_ip_from_header(&map, "cf-connecting-ip"), None);
    }

    #[test]
    fn test_rejects_lists_and_garbage() {
        let map = headers("cf-connecting-ip", "203.0.113.5, 10.0.0.1");
        assert_eq!(client_ip_from_header(&map, "cf-connecting-ip"), None);

        let map = headers("cf-connecting-ip", "not-an-ip");
        assert_eq!(client_ip_from_header(&map, "cf-connecting-ip"), None);
    }

    #[test]
    fn test_normalizes_ipv6() {
        let map = headers("cf-connecting-ip", " 2001:0db8:0000::0001 ");
        assert_eq!(
            client_ip_from_header(&map, "cf-connecting-ip").as_deref(),
            Some("2001:db8::1")
        );

        let map = headers("cf-connecting-ip", "::ffff:203.0.113.5");
        assert_eq!(
            client_ip_from_header(&map, "cf-connecting-ip").as_deref(),
            Some("203.0.113.5")
        );
    }

    #[test]
    fn test_same_ip_compares_addresses() {
        assert!(same_ip("203.0.113.5", "203.0.113.5"));
        assert!(same_ip("::ffff:203.0.113.5", "203.0.113.5"));
        assert!(same_ip("2001:DB8::1", "2001:db8::1"));
        assert!(same_ip("2001:0db8:0:0:0:0:0:1", "2001:db8::1"));
        assert!(!same_ip("203.0.113.5", "203.0.113.6"));
        assert!(!same_ip("2001:db8::1", "2001:db8::2"));
    }

    #[test]
    fn test_same_ip_unparseable_needs_exact_match() {
        assert!(same_ip("dev-box", "dev-box"));
        assert!(!same_ip("dev-box", "203.0.113.5"));
    }
}
