//! SHA-256 verification of downloaded candidates

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, UpdateError};

/// Read buffer for hashing (64KB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Verification status of an installed candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched the published checksum
    Verified { digest: String },
    /// The release published no checksum, so nothing was compared
    Unverified,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Compares a file's digest with a published checksum manifest
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Verify `file`, downloaded from `binary_asset`, against the first token
    /// of `checksum_file`, downloaded from `checksum_asset`. The asset names
    /// are what errors report.
    ///
    /// Returns the computed digest on success. A mismatch is always an error.
    pub fn verify(
        file: &Path,
        checksum_file: &Path,
        binary_asset: &str,
        checksum_asset: &str,
    ) -> Result<String> {
        let manifest = std::fs::read_to_string(checksum_file)
            .map_err(|e| UpdateError::io_with_path("read checksum file", checksum_file, e))?;

        let expected = Self::parse_expected(&manifest).ok_or_else(|| {
            UpdateError::MalformedChecksum {
                asset: checksum_asset.to_string(),
            }
        })?;

        let actual = Self::sha256_file(file)?;
        debug!(
            "Checksum for {}: expected {}, actual {}",
            binary_asset, expected, actual
        );

        if actual.eq_ignore_ascii_case(expected) {
            Ok(actual)
        } else {
            Err(UpdateError::ChecksumMismatch {
                asset: binary_asset.to_string(),
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }

    /// First whitespace-delimited token of a checksum manifest
    pub fn parse_expected(manifest: &str) -> Option<&str> {
        manifest.split_whitespace().next()
    }

    /// Lowercase hex SHA-256 of a file's full contents
    pub fn sha256_file(path: &Path) -> Result<String> {
        let mut file =
            File::open(path).map_err(|e| UpdateError::io_with_path("open", path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .map_err(|e| UpdateError::io_with_path("read", path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
