//! Shared helpers for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};

/// Generate a self-signed CA certificate expiring at `not_after` (Unix seconds)
pub fn ca_cert_pem(not_after: i64) -> String {
    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, "kubernetes");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.not_before = time::OffsetDateTime::from_unix_timestamp(not_after - 86_400 * 365)
        .expect("valid not_before");
    params.not_after =
        time::OffsetDateTime::from_unix_timestamp(not_after).expect("valid not_after");

    let key_pair = KeyPair::generate().expect("key generation");
    params.self_signed(&key_pair).expect("self-signed cert").pem()
}

/// Write `contents` to a fresh temporary file
pub fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}
