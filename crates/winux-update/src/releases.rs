//! Latest-release resolution and update planning

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use winux_core::types::{AssetConfig, UpdaterConfig};

use crate::error::{Result, UpdateError};
use crate::notification::{summarize_notes, UpdateInfo};
use crate::version::{is_newer, strip_v_prefix};

/// Media type requested from the registry
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Release information. Unknown fields in the registry response are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag (e.g., "v0.2.0")
    pub tag_name: String,

    /// Release title
    #[serde(default)]
    pub name: Option<String>,

    /// Release notes
    #[serde(default)]
    pub body: Option<String>,

    /// Release page URL
    #[serde(default)]
    pub html_url: String,

    /// Published date
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Release assets
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
}

impl ReleaseDescriptor {
    /// Tag without its `v` prefix
    pub fn version(&self) -> &str {
        strip_v_prefix(&self.tag_name)
    }
}

/// Release asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Asset name
    pub name: String,

    /// Download URL
    pub browser_download_url: String,

    /// Asset size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Fetches metadata for the latest published release
pub struct ReleaseResolver {
    client: reqwest::Client,
    url: String,
}

impl ReleaseResolver {
    /// Create a resolver for the configured registry
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.metadata_timeout_secs))
            .connect_timeout(Duration::from_secs(config.network.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.registry.latest_release_url(),
        })
    }

    /// Endpoint queried by [`fetch_latest`](Self::fetch_latest)
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the latest release. A single attempt; failures are not retried.
    pub async fn fetch_latest(&self) -> Result<ReleaseDescriptor> {
        debug!("Fetching latest release from: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: self.url.clone(),
                status,
            });
        }

        let body = response.bytes().await?;
        let release: ReleaseDescriptor = serde_json::from_slice(&body)?;

        debug!(
            "Latest release {} with {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}

/// Decision record for one check or apply
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    /// Version of the running binary
    pub current_version: String,

    /// Version of the latest release, without `v` prefix
    pub latest_version: String,

    /// The asset that would be installed
    pub binary: Option<AssetDescriptor>,

    /// Digest manifest for the binary
    pub checksum: Option<AssetDescriptor>,

    /// The release the plan was derived from
    pub release: ReleaseDescriptor,
}

impl UpdatePlan {
    /// Build a plan by comparing versions and selecting assets
    pub fn resolve(current_version: &str, release: ReleaseDescriptor, rules: &AssetConfig) -> Self {
        let binary = select_binary(&release.assets, rules).cloned();
        let checksum = select_checksum(&release.assets, binary.as_ref(), rules).cloned();

        let plan = Self {
            current_version: strip_v_prefix(current_version).to_string(),
            latest_version: release.version().to_string(),
            binary,
            checksum,
            release,
        };

        info!(
            "Current {} / latest {} (update available: {})",
            plan.current_version,
            plan.latest_version,
            plan.available()
        );
        plan
    }

    /// True iff the latest release is strictly newer than the running version
    pub fn available(&self) -> bool {
        is_newer(&self.latest_version, &self.current_version)
    }

    /// The binary asset, or an explicit error when none matched
    pub fn require_binary(&self) -> Result<&AssetDescriptor> {
        self.binary.as_ref().ok_or_else(|| UpdateError::BinaryNotFound {
            tag: self.release.tag_name.clone(),
        })
    }

    /// Structured notification for a presentation layer
    pub fn info(&self, summary_lines: usize) -> UpdateInfo {
        let notes = self.release.body.clone().unwrap_or_default();
        UpdateInfo {
            available: self.available(),
            current_version: self.current_version.clone(),
            latest_version: self.latest_version.clone(),
            summary: summarize_notes(&notes, summary_lines),
            release_notes: notes,
            release_url: self.release.html_url.clone(),
            download_url: self
                .binary
                .as_ref()
                .map(|asset| asset.browser_download_url.clone()),
            published_at: self.release.published_at,
        }
    }
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.to_ascii_lowercase()
        .ends_with(&suffix.to_ascii_lowercase())
}

fn is_updater_asset(name: &str, rules: &AssetConfig) -> bool {
    !rules.updater_marker.is_empty()
        && name
            .to_ascii_lowercase()
            .contains(&rules.updater_marker.to_ascii_lowercase())
}

fn is_checksum_asset(name: &str, rules: &AssetConfig) -> bool {
    ends_with_ignore_case(name, &rules.checksum_suffix)
}

/// First asset carrying the binary suffix that is neither the updater
/// itself nor a checksum file
fn select_binary<'a>(
    assets: &'a [AssetDescriptor],
    rules: &AssetConfig,
) -> Option<&'a AssetDescriptor> {
    assets.iter().find(|asset| {
        ends_with_ignore_case(&asset.name, &rules.binary_suffix)
            && !is_updater_asset(&asset.name, rules)
            && !is_checksum_asset(&asset.name, rules)
    })
}

/// Prefer `<binary><suffix>`, then any checksum file not belonging to the
/// updater. A checksum for the updater is never paired with the binary.
fn select_checksum<'a>(
    assets: &'a [AssetDescriptor],
    binary: Option<&AssetDescriptor>,
    rules: &AssetConfig,
) -> Option<&'a AssetDescriptor> {
    if let Some(binary) = binary {
        let paired = format!("{}{}", binary.name, rules.checksum_suffix);
        if let Some(asset) = assets
            .iter()
            .find(|asset| asset.name.eq_ignore_ascii_case(&paired))
        {
            return Some(asset);
        }
    }

    assets
        .iter()
        .find(|asset| is_checksum_asset(&asset.name, rules) && !is_updater_asset(&asset.name, rules))
}
