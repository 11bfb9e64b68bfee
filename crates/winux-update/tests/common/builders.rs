//! Builder for release registry documents

use serde_json::{json, Value};

use super::constants::*;

/// Builder for the JSON returned by the latest-release endpoint
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    base_url: String,
    tag_name: String,
    body: Option<String>,
    assets: Vec<Value>,
}

impl ReleaseBuilder {
    /// Assets are served from `{base_url}/download/{name}`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tag_name: NEWER_TAG.to_string(),
            body: Some(RELEASE_NOTES.to_string()),
            assets: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag_name = tag.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Add an asset whose advertised size matches `content`
    pub fn asset(self, name: &str, content: &[u8]) -> Self {
        self.asset_with_size(name, content.len() as u64)
    }

    pub fn asset_with_size(mut self, name: &str, size: u64) -> Self {
        self.assets.push(json!({
            "url": format!("{}/api/assets/{}", self.base_url, name),
            "name": name,
            "content_type": "application/octet-stream",
            "browser_download_url": asset_url(&self.base_url, name),
            "size": size,
            "download_count": 0
        }));
        self
    }

    /// Binary plus its updater sibling, the usual release layout
    pub fn with_standard_assets(self, binary: &[u8]) -> Self {
        self.asset(UPDATER_ASSET, UPDATER_BINARY)
            .asset(BINARY_ASSET, binary)
    }

    pub fn build(self) -> Value {
        json!({
            "id": 1,
            "tag_name": self.tag_name,
            "name": format!("WINUX {}", self.tag_name),
            "body": self.body,
            "draft": false,
            "prerelease": false,
            "html_url": format!("{}/releases/tag/{}", self.base_url, self.tag_name),
            "published_at": "2026-09-01T12:00:00Z",
            "author": { "login": "winux-bot" },
            "assets": self.assets
        })
    }
}

/// Download URL of a named asset on the mock server
pub fn asset_url(base_url: &str, name: &str) -> String {
    format!("{}/download/{}", base_url.trim_end_matches('/'), name)
}
