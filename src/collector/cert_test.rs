//! Tests for certificate expiry extraction

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::testutil::{ca_cert_pem, temp_file};

/// 2031-01-01T00:00:00Z
const NOT_AFTER: i64 = 1_924_992_000;

#[test]
fn test_parse_expiry_returns_not_after() {
    let pem = ca_cert_pem(NOT_AFTER);

    let expiry = parse_expiry(pem.as_bytes()).unwrap();

    assert_eq!(expiry.timestamp(), NOT_AFTER);
}

#[test]
fn test_parse_expiry_uses_first_block_only() {
    let first = ca_cert_pem(NOT_AFTER);
    let second = ca_cert_pem(NOT_AFTER + 86_400);
    let bundle = format!("{}{}", first, second);

    let expiry = parse_expiry(bundle.as_bytes()).unwrap();

    assert_eq!(expiry.timestamp(), NOT_AFTER);
}

#[test]
fn test_parse_expiry_skips_leading_text() {
    let pem = format!("# cluster CA\n{}", ca_cert_pem(NOT_AFTER));

    let expiry = parse_expiry(pem.as_bytes()).unwrap();

    assert_eq!(expiry.timestamp(), NOT_AFTER);
}

#[test]
fn test_parse_expiry_skips_undecodable_block() {
    let broken = "-----BEGIN CERTIFICATE-----\n!!!not base64!!!\n-----END CERTIFICATE-----\n";
    let pem = format!("{}{}", broken, ca_cert_pem(NOT_AFTER));

    let expiry = parse_expiry(pem.as_bytes()).unwrap();

    assert_eq!(expiry.timestamp(), NOT_AFTER);
}

#[test]
fn test_parse_expiry_with_only_undecodable_block_is_malformed_pem() {
    let broken = "-----BEGIN CERTIFICATE-----\n!!!not base64!!!\n-----END CERTIFICATE-----\n";

    let result = parse_expiry(broken.as_bytes());

    assert!(
        matches!(result, Err(CertError::MalformedPem(_))),
        "Expected MalformedPem, got {:?}",
        result
    );
}

#[test]
fn test_parse_expiry_without_pem_block_is_malformed_pem() {
    let result = parse_expiry(b"test file's content");

    assert!(
        matches!(result, Err(CertError::MalformedPem(_))),
        "Expected MalformedPem, got {:?}",
        result
    );
}

#[test]
fn test_parse_expiry_with_invalid_der_is_malformed_certificate() {
    // "hello world" is valid base64 but not a DER certificate
    let pem = "-----BEGIN CERTIFICATE-----\naGVsbG8gd29ybGQ=\n-----END CERTIFICATE-----\n";

    let result = parse_expiry(pem.as_bytes());

    assert!(
        matches!(result, Err(CertError::MalformedCertificate(_))),
        "Expected MalformedCertificate, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_read_expiry_from_file() {
    let file = temp_file(ca_cert_pem(NOT_AFTER).as_bytes());

    let expiry = read_expiry(file.path()).await.unwrap();

    assert_eq!(expiry.timestamp(), NOT_AFTER);
}

#[tokio::test]
async fn test_read_expiry_missing_file_is_file_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.crt");

    let result = read_expiry(&path).await;

    match result {
        Err(CertError::FileRead { path: p, .. }) => assert_eq!(p, path),
        other => panic!("Expected FileRead, got {:?}", other),
    }
}
