//! Temporary install environment wired to a mock registry

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use winux_core::UpdaterConfig;
use winux_update::UpdatePipeline;

use super::constants::*;

/// An install directory and scratch root under one temp dir, plus a
/// configuration pointing at `api_url`
pub struct TestEnv {
    _root: TempDir,
    pub install_dir: PathBuf,
    pub scratch_root: PathBuf,
    pub config: UpdaterConfig,
}

impl TestEnv {
    pub fn new(api_url: &str) -> Self {
        let root = TempDir::new().unwrap();
        let install_dir = root.path().join("bin");
        let scratch_root = root.path().join("scratch");
        fs::create_dir_all(&install_dir).unwrap();
        fs::create_dir_all(&scratch_root).unwrap();

        let mut config = UpdaterConfig::default();
        config.registry.api_url = api_url.to_string();
        config.network.metadata_timeout_secs = 5;
        config.network.download_timeout_secs = 10;
        config.install.binary_name = INSTALLED_NAME.to_string();
        config.install.install_dir = Some(install_dir.clone());
        config.install.scratch_root = Some(scratch_root.clone());

        Self {
            _root: root,
            install_dir,
            scratch_root,
            config,
        }
    }

    /// Place an existing binary at the install path
    pub fn with_installed(self, content: &[u8]) -> Self {
        fs::write(self.install_path(), content).unwrap();
        self
    }

    pub fn pipeline(&self) -> UpdatePipeline {
        UpdatePipeline::new(self.config.clone(), CURRENT_VERSION).unwrap()
    }

    pub fn install_path(&self) -> PathBuf {
        self.install_dir.join(INSTALLED_NAME)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.install_dir.join(format!("{}.backup", INSTALLED_NAME))
    }

    pub fn installed_bytes(&self) -> Vec<u8> {
        fs::read(self.install_path()).unwrap()
    }

    /// Sorted entry names of the install directory
    pub fn install_dir_entries(&self) -> Vec<String> {
        dir_entries(&self.install_dir)
    }

    /// True when every per-attempt scratch directory has been removed. The
    /// commit lock file is shared across attempts and stays.
    pub fn scratch_is_empty(&self) -> bool {
        dir_entries(&self.scratch_root)
            .iter()
            .all(|name| name == LOCK_FILE)
    }
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
