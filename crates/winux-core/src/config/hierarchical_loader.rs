//! Hierarchical configuration loader with precedence
//!
//! Loads the updater configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (~/.winux/update.yaml) or an explicit file
//! 3. Environment variables (WINUX_UPDATE_* prefix)
//! 4. CLI flags (handled by caller)
//!
//! File layers are merged key by key, so a user file only needs the values
//! it changes.

use crate::error::{Error, Result};
use crate::types::UpdaterConfig;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const DEFAULTS_FILE: &str = "update-defaults.yaml";
const USER_CONFIG_FILE: &str = "update.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the standard config directory
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// The standard config directory (~/.winux). It is never created here.
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|p| Error::invalid_config(format!("Home directory is not UTF-8: {:?}", p)))?;
        Ok(home.join(".winux"))
    }

    /// Load the updater configuration with hierarchical precedence
    pub fn load_updater_config(&self) -> Result<UpdaterConfig> {
        let user_config = self.config_dir.join(USER_CONFIG_FILE);
        let overlay = if user_config.exists() {
            Some(user_config)
        } else {
            debug!("No user config at {}, using defaults", user_config);
            None
        };
        Self::load_layers(overlay.as_deref())
    }

    /// Load the updater configuration from an explicit file.
    ///
    /// The file is layered over the embedded defaults and environment
    /// overrides still apply. A missing file is an error.
    pub fn load_from_path(&self, path: &Utf8Path) -> Result<UpdaterConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }
        Self::load_layers(Some(path))
    }

    fn load_layers(overlay: Option<&Utf8Path>) -> Result<UpdaterConfig> {
        let mut merged = Self::load_embedded_value(DEFAULTS_FILE)?;

        if let Some(path) = overlay {
            debug!("Loading updater config from {}", path);
            let file_value = Self::load_yaml_value(path)?;
            merge_values(&mut merged, file_value);
        }

        let config: UpdaterConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Failed to parse updater config: {}", e)))?;

        let config = Self::apply_env_overrides(config)?;
        config.validate()?;
        Ok(config)
    }

    /// Directory searched for the user config file
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    fn load_embedded_value(filename: &str) -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    fn load_yaml_value(path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        // An empty file parses as null and leaves the defaults alone
        Ok(value)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: UpdaterConfig) -> Result<UpdaterConfig> {
        if let Ok(val) = env::var("WINUX_UPDATE_API_URL") {
            config.registry.api_url = val;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_REPO_OWNER") {
            config.registry.repo_owner = val;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_REPO_NAME") {
            config.registry.repo_name = val;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_METADATA_TIMEOUT_SECS") {
            config.network.metadata_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("WINUX_UPDATE_METADATA_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("WINUX_UPDATE_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_USER_AGENT") {
            config.network.user_agent = val;
        }

        if let Ok(val) = env::var("WINUX_UPDATE_INSTALL_DIR") {
            config.install.install_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("WINUX_UPDATE_BINARY_NAME") {
            config.install.binary_name = val;
        }

        Ok(config)
    }
}

/// Deep-merge `overlay` into `base`. Mappings merge per key, anything else
/// replaces the base value. A null overlay is ignored.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
