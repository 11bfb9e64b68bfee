//! Error taxonomy for the update engine

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using the engine's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors produced while checking for or applying an update.
///
/// Every variant is terminal for the current invocation; the engine never
/// retries on its own.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Transport failure, DNS failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Request to {url} failed with HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The release registry returned a body that is not a release document
    #[error("Malformed release metadata: {0}")]
    Parse(#[from] serde_json::Error),

    /// No asset in the release matches the binary naming rule
    #[error("Binary not found in the assets of release {tag}")]
    BinaryNotFound { tag: String },

    /// The downloaded candidate does not match the published digest
    #[error(
        "Checksum mismatch for {asset}: expected {expected}, got {actual}. \
         The download may be corrupted or tampered with; nothing was installed"
    )]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    /// The published checksum file contains no digest
    #[error("Checksum file {asset} does not contain a digest")]
    MalformedChecksum { asset: String },

    /// The downloaded byte count differs from the advertised asset size
    #[error("Downloaded {actual} bytes but the release advertises {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Filesystem failure with the path that caused it
    #[error("Failed to {context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Installing failed and restoring the backup failed as well
    #[error(
        "Install failed ({install_error}) and restoring the backup failed ({restore_error}). \
         Manual recovery required: copy {} to {}",
        .backup_path.display(),
        .install_path.display()
    )]
    RollbackFailed {
        install_error: Box<UpdateError>,
        restore_error: Box<UpdateError>,
        install_path: PathBuf,
        backup_path: PathBuf,
    },

    /// Another apply currently holds the commit lock
    #[error("Another update is in progress (lock held on {})", .path.display())]
    Locked { path: PathBuf },

    /// The caller cancelled the operation
    #[error("Update cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] winux_core::Error),
}

impl UpdateError {
    /// Wrap an IO error with what was being attempted and on which path
    pub fn io_with_path(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Network-class failures: transport errors and non-success statuses
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }

    /// Integrity failures, which must never be downgraded to warnings
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::MalformedChecksum { .. } | Self::SizeMismatch { .. }
        )
    }

    /// Whether a human has to restore the binary by hand
    pub fn requires_manual_recovery(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}
