//! Command implementations

pub mod apply;
pub mod check;

use anyhow::{Context, Result};
use camino::Utf8Path;
use winux_core::{HierarchicalConfigLoader, UpdaterConfig};

/// Resolve the updater configuration from `--config` (or the user config
/// directory) and apply the `--install-dir` flag on top.
pub fn load_config(
    config_path: Option<&Utf8Path>,
    install_dir: Option<&Utf8Path>,
) -> Result<UpdaterConfig> {
    let loader = HierarchicalConfigLoader::new().context("Failed to locate config directory")?;

    let mut config = match config_path {
        Some(path) => loader
            .load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => loader
            .load_updater_config()
            .with_context(|| format!("Failed to load config from {}", loader.config_dir()))?,
    };

    if let Some(dir) = install_dir {
        config.install.install_dir = Some(dir.as_std_path().to_path_buf());
    }

    config.validate().context("Invalid updater configuration")?;
    Ok(config)
}
