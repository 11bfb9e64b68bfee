//! Updater configuration types
//!
//! These types carry everything the update engine would otherwise hardcode:
//! the release registry endpoint, client identification, timeouts, asset
//! naming rules and the on-disk layout of the installed binary. A complete
//! value is passed to the pipeline constructor, which lets tests point the
//! engine at a local fixture server and a temporary install directory.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete updater configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdaterConfig {
    /// Release registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Network timeouts and client identification
    #[serde(default)]
    pub network: NetworkConfig,

    /// Release asset naming rules
    #[serde(default)]
    pub assets: AssetConfig,

    /// Install location and filesystem layout
    #[serde(default)]
    pub install: InstallConfig,

    /// Background check and notification settings
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl UpdaterConfig {
    /// Reject values the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.install.binary_name.trim().is_empty() {
            return Err(Error::invalid_config("install.binary-name must not be empty"));
        }
        if self.install.binary_name.contains(['/', '\\']) {
            return Err(Error::invalid_config(format!(
                "install.binary-name must be a file name, got '{}'",
                self.install.binary_name
            )));
        }
        if self.install.backup_suffix.is_empty() {
            return Err(Error::invalid_config(
                "install.backup-suffix must not be empty",
            ));
        }
        if self.install.lock_file.trim().is_empty() {
            return Err(Error::invalid_config("install.lock-file must not be empty"));
        }
        if self.network.metadata_timeout_secs == 0 || self.network.download_timeout_secs == 0 {
            return Err(Error::invalid_config(
                "network timeouts must be greater than zero",
            ));
        }
        if self.assets.binary_suffix.is_empty() {
            return Err(Error::invalid_config(
                "assets.binary-suffix must not be empty",
            ));
        }
        Ok(())
    }
}

/// Release registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Base URL for the GitHub-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Repository owner
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// Repository name
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
}

impl RegistryConfig {
    /// Endpoint returning the latest published release
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            self.repo_owner,
            self.repo_name
        )
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_repo_owner() -> String {
    "CRTYPUBG".to_string()
}
fn default_repo_name() -> String {
    "winux".to_string()
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for the release metadata request in seconds
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    /// Timeout for an asset download in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Minimum interval between progress notifications in milliseconds
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            metadata_timeout_secs: default_metadata_timeout(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            progress_interval_ms: default_progress_interval(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_metadata_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_progress_interval() -> u64 {
    100
}
fn default_user_agent() -> String {
    format!(
        "winux-update/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Release asset naming rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssetConfig {
    /// Suffix identifying the installable binary
    #[serde(default = "default_binary_suffix")]
    pub binary_suffix: String,

    /// Substring marking the updater's own executable, which is never installed
    #[serde(default = "default_updater_marker")]
    pub updater_marker: String,

    /// Suffix identifying the digest manifest
    #[serde(default = "default_checksum_suffix")]
    pub checksum_suffix: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            binary_suffix: default_binary_suffix(),
            updater_marker: default_updater_marker(),
            checksum_suffix: default_checksum_suffix(),
        }
    }
}

fn default_binary_suffix() -> String {
    ".exe".to_string()
}
fn default_updater_marker() -> String {
    "update".to_string()
}
fn default_checksum_suffix() -> String {
    ".sha256".to_string()
}

/// Install location and filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallConfig {
    /// File name of the installed binary
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Directory holding the installed binary.
    /// Defaults to the directory of the running executable.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Suffix appended to the binary name for the transient backup
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Lock file held during the commit window, created in the scratch root
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    /// Prefix of the per-attempt scratch directory
    #[serde(default = "default_scratch_prefix")]
    pub scratch_prefix: String,

    /// Parent of the scratch directory. Defaults to the system temp dir.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
}

impl InstallConfig {
    /// Directory holding per-attempt scratch directories and the commit lock
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            binary_name: default_binary_name(),
            install_dir: None,
            backup_suffix: default_backup_suffix(),
            lock_file: default_lock_file(),
            scratch_prefix: default_scratch_prefix(),
            scratch_root: None,
        }
    }
}

fn default_binary_name() -> String {
    if cfg!(windows) {
        "winux.exe".to_string()
    } else {
        "winux".to_string()
    }
}
fn default_backup_suffix() -> String {
    ".backup".to_string()
}
fn default_lock_file() -> String {
    "winux-update.lock".to_string()
}
fn default_scratch_prefix() -> String {
    "winux-update-".to_string()
}

/// Background check and notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotificationConfig {
    /// Delay before a deferred background check starts, in seconds
    #[serde(default = "default_check_delay")]
    pub check_delay_secs: u64,

    /// Maximum number of summary lines extracted from release notes
    #[serde(default = "default_summary_lines")]
    pub summary_lines: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            check_delay_secs: default_check_delay(),
            summary_lines: default_summary_lines(),
        }
    }
}

fn default_check_delay() -> u64 {
    3
}
fn default_summary_lines() -> usize {
    5
}
