// tbx-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tbx_common::error::{Result, TbxError};
use url::Url;

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256: {} ({} bytes read)",
        actual,
        bytes_copied
    );
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(TbxError::ChecksumError(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Repository checksum files hold the digest, optionally followed by the
/// file name.
pub fn parse_checksum_file(content: &str) -> Option<String> {
    content
        .split_whitespace()
        .next()
        .filter(|digest| digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()))
        .map(str::to_ascii_lowercase)
}

/// Validates a repository URL. Only http and https are spoken; plain http
/// is accepted with a warning since private mirrors still use it.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| TbxError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" => {
            tracing::warn!("Using insecure repository URL {}", url_str);
            Ok(())
        }
        scheme => Err(TbxError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': must be http or https, but got '{scheme}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn checksum_matches_file_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let digest = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        verify_checksum(file.path(), digest).unwrap();
        verify_checksum(file.path(), &digest.to_uppercase()).unwrap();
        assert!(matches!(
            verify_checksum(file.path(), &"0".repeat(64)),
            Err(TbxError::ChecksumError(_))
        ));
    }

    #[test]
    fn checksum_files_may_carry_a_file_name() {
        let digest = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(
            parse_checksum_file(&format!("{digest}  lib-1.0.jar\n")).as_deref(),
            Some(digest)
        );
        assert_eq!(parse_checksum_file("not a digest"), None);
    }

    #[test]
    fn only_http_schemes_are_valid() {
        assert!(validate_url("https://repo.maven.apache.org/maven2").is_ok());
        assert!(validate_url("http://nexus.internal/repository").is_ok());
        assert!(validate_url("ftp://example.com/repo").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
