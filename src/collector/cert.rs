//! Certificate expiry extraction
//!
//! Reads a PEM file, decodes the first valid PEM block and parses it as an X.509
//! certificate. Only the `NotAfter` field is of interest; no chain or trust
//! validation is performed.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading a certificate's expiry
#[derive(Debug, Error)]
pub enum CertError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PEM block: {0}")]
    MalformedPem(#[from] pem::PemError),

    #[error("Failed to parse certificate: {0}")]
    MalformedCertificate(String),

    #[error("Certificate NotAfter is out of range: {0}")]
    InvalidTimestamp(i64),
}

/// Read the file at `path` and return the expiry of the certificate it holds
pub async fn read_expiry(path: &Path) -> Result<DateTime<Utc>, CertError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| CertError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    parse_expiry(&data)
}

/// Return the `NotAfter` of the first PEM-encoded certificate in `data`
///
/// Any content after the first decodable PEM block is ignored.
pub fn parse_expiry(data: &[u8]) -> Result<DateTime<Utc>, CertError> {
    let block = first_pem_block(data)?;

    let (_, cert) = x509_parser::parse_x509_certificate(block.contents())
        .map_err(|e| CertError::MalformedCertificate(e.to_string()))?;

    let not_after = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(not_after, 0).ok_or(CertError::InvalidTimestamp(not_after))
}

const PEM_BEGIN: &[u8] = b"-----BEGIN ";

/// Decode the first well-formed PEM block
///
/// Blocks with broken framing or base64 are skipped. If none decodes, the
/// error from the first candidate is returned.
fn first_pem_block(data: &[u8]) -> Result<pem::Pem, pem::PemError> {
    let mut first_error = None;
    let mut rest = data;

    while let Some(start) = rest
        .windows(PEM_BEGIN.len())
        .position(|window| window == PEM_BEGIN)
    {
        match pem::parse(&rest[start..]) {
            Ok(block) => return Ok(block),
            Err(e) => {
                first_error.get_or_insert(e);
                rest = &rest[start + PEM_BEGIN.len()..];
            }
        }
    }

    Err(first_error.unwrap_or(pem::PemError::MalformedFraming))
}

#[cfg(test)]
#[path = "cert_test.rs"]
mod tests;
