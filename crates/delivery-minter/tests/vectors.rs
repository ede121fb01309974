//! Known-answer tests pinning the wire format shared with the edge gateway

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use delivery_config::{MinterConfig, SharedSecret};
use delivery_minter::canonical::{canonical_string, compute_mac, serialize_token};
use delivery_minter::{MintRequest, Minter};
use serde::Deserialize;

const VECTORS: &str = include_str!("../../../testdata/capability_vectors.json");

#[derive(Deserialize)]
struct VectorFile {
    secret: String,
    vectors: Vec<Vector>,
}

#[derive(Deserialize)]
struct Vector {
    resource_path: String,
    subject_id: String,
    client_ip: String,
    issued_at: i64,
    expires_at: i64,
    canonical: String,
    mac: String,
    token: String,
}

fn load() -> VectorFile {
    serde_json::from_str(VECTORS).expect("capability_vectors.json must parse")
}

#[test]
fn test_canonical_mac_and_token_match_vectors() {
    let file = load();
    let secret = SharedSecret::new(file.secret.clone());

    for v in &file.vectors {
        let canonical = canonical_string(
            &v.resource_path,
            &v.subject_id,
            &v.client_ip,
            v.issued_at,
            v.expires_at,
        );
        assert_eq!(canonical, v.canonical, "canonical for {}", v.resource_path);

        let mac = compute_mac(&secret, &canonical);
        assert_eq!(BASE64.encode(&mac), v.mac, "mac for {}", v.resource_path);

        let token = serialize_token(&v.subject_id, &v.client_ip, v.issued_at, v.expires_at, &mac);
        assert_eq!(token, v.token);
    }
}

#[test]
fn test_minter_reproduces_vectors() {
    let file = load();
    let minter = Minter::new(
        &MinterConfig::default(),
        Some(&SharedSecret::new(file.secret.clone())),
    )
    .unwrap();

    for v in &file.vectors {
        let subject = Some(v.subject_id.as_str()).filter(|s| !s.is_empty());
        let request = MintRequest::new(&v.resource_path, &v.client_ip, v.expires_at - v.issued_at)
            .subject(subject);

        let cap = minter.mint_at(&request, v.issued_at).unwrap();
        assert_eq!(cap.token, v.token);
        assert_eq!(cap.expires_at, v.expires_at);
    }
}

#[test]
fn test_concrete_scenario_token() {
    let file = load();
    let minter = Minter::new(
        &MinterConfig::default(),
        Some(&SharedSecret::new(file.secret)),
    )
    .unwrap();

    let request = MintRequest::new("/user_files/42.png", "203.0.113.5", 120).subject(Some("7"));
    let cap = minter.mint_at(&request, 1_700_000_000).unwrap();

    assert_eq!(
        cap.token,
        "7-203.0.113.5-1700000000-1700000120-uJ8VOL/0ombdhfkTSeowB9TV8eLj3u3KUTIHDy0vfg8="
    );
    assert!(cap
        .url
        .starts_with("http://localhost:8787/user_files/42.png?verify=7-203.0.113.5-"));
}
