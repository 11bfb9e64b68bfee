//! Shared constants for test infrastructure

use sha2::{Digest, Sha256};

pub const CURRENT_VERSION: &str = "0.1.0";
pub const NEWER_TAG: &str = "v0.2.0";
pub const SAME_TAG: &str = "v0.1.0";

pub const BINARY_ASSET: &str = "winux.exe";
pub const CHECKSUM_ASSET: &str = "winux.exe.sha256";
pub const UPDATER_ASSET: &str = "update.exe";
pub const INSTALLED_NAME: &str = "winux.exe";
pub const LOCK_FILE: &str = "winux-update.lock";

pub const LATEST_RELEASE_PATH: &str = "/repos/CRTYPUBG/winux/releases/latest";
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

pub const OLD_BINARY: &[u8] = b"old winux binary v0.1.0";
pub const NEW_BINARY: &[u8] = b"new winux binary v0.2.0 with a few more bytes";
pub const UPDATER_BINARY: &[u8] = b"updater binary";

pub const WRONG_CHECKSUM: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub const RELEASE_NOTES: &str = "## Highlights\n- grep -i\n- faster ls\n\nThanks!";

/// Lowercase hex SHA-256 of `content`
pub fn sha256_hex(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Checksum manifest in `sha256sum` format
pub fn checksum_manifest(content: &[u8], name: &str) -> String {
    format!("{}  {}\n", sha256_hex(content), name)
}
