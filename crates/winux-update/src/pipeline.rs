//! Check and apply orchestration
//!
//! `check` resolves the latest release into an [`UpdatePlan`]. `apply`
//! re-derives the plan and, when an update is due (or forced), drives the
//! download, verification and commit steps through an [`InstallManager`].
//!
//! Every apply attempt gets its own scratch directory. The candidate binary
//! and its checksum file live there and the directory is removed before
//! `apply` returns, whatever the outcome.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use winux_core::types::UpdaterConfig;

use crate::download::{human_readable_size, DownloadProgress, Downloader};
use crate::error::{Result, UpdateError};
use crate::install::{InstallFs, InstallLayout, InstallManager, InstallOutcome, OsFs};
use crate::notification::UpdateInfo;
use crate::observer::UpdateObserver;
use crate::releases::{AssetDescriptor, ReleaseResolver, UpdatePlan};
use crate::verify::{IntegrityVerifier, Verification};

const CANDIDATE_FILE: &str = "candidate.bin";
const CHECKSUM_FILE: &str = "candidate.sha256";

/// Options for [`UpdatePipeline::apply`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Reinstall even when the latest release is not newer
    pub force: bool,
}

/// Result of an apply call that got past release resolution
#[derive(Debug)]
pub enum ApplyResult {
    /// Nothing to do; no download happened and nothing was touched
    UpToDate { version: String },
    /// The install state machine ran to a terminal state
    Completed {
        from: String,
        to: String,
        outcome: InstallOutcome,
    },
}

impl ApplyResult {
    /// Up to date, or the new binary is installed
    pub fn is_success(&self) -> bool {
        match self {
            Self::UpToDate { .. } => true,
            Self::Completed { outcome, .. } => outcome.is_done(),
        }
    }
}

/// The self-update engine
pub struct UpdatePipeline<F: InstallFs = OsFs> {
    config: UpdaterConfig,
    current_version: String,
    resolver: ReleaseResolver,
    downloader: Downloader,
    layout: InstallLayout,
    fs: F,
}

impl UpdatePipeline<OsFs> {
    /// Create a pipeline for the binary at `config.install`, currently at
    /// `current_version`
    pub fn new(config: UpdaterConfig, current_version: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let layout = InstallLayout::resolve(&config.install)?;
        debug!(
            "Update pipeline: registry={}, install={:?}",
            config.registry.latest_release_url(),
            layout.install_path
        );

        Ok(Self {
            resolver: ReleaseResolver::new(&config)?,
            downloader: Downloader::new(&config)?,
            layout,
            fs: OsFs,
            current_version: current_version.into(),
            config,
        })
    }
}

impl<F: InstallFs> UpdatePipeline<F> {
    /// Swap the filesystem used for the commit window
    pub fn with_fs<G: InstallFs>(self, fs: G) -> UpdatePipeline<G> {
        UpdatePipeline {
            config: self.config,
            current_version: self.current_version,
            resolver: self.resolver,
            downloader: self.downloader,
            layout: self.layout,
            fs,
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Fetch the latest release and compare it with the running version
    pub async fn check(&self) -> Result<UpdatePlan> {
        let release = self.resolver.fetch_latest().await?;
        Ok(UpdatePlan::resolve(
            &self.current_version,
            release,
            &self.config.assets,
        ))
    }

    /// [`check`](Self::check), rendered as a notification
    pub async fn check_info(&self) -> Result<UpdateInfo> {
        let plan = self.check().await?;
        Ok(plan.info(self.config.notification.summary_lines))
    }

    /// Download, verify and install the latest release.
    ///
    /// Errors returned directly (registry failures, a release without a
    /// usable binary, cancellation during the metadata fetch) happen before
    /// anything is downloaded. Once the state machine starts the result is
    /// an [`InstallOutcome`] inside [`ApplyResult::Completed`].
    pub async fn apply(
        &self,
        options: ApplyOptions,
        observer: &dyn UpdateObserver,
        cancel: &CancellationToken,
    ) -> Result<ApplyResult> {
        let plan = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            plan = self.check() => plan?,
        };

        if !plan.available() && !options.force {
            info!("Already up to date ({})", plan.current_version);
            return Ok(ApplyResult::UpToDate {
                version: plan.current_version,
            });
        }

        let binary = plan.require_binary()?.clone();
        if plan.available() {
            info!(
                "Updating {} -> {}",
                plan.current_version, plan.latest_version
            );
        } else {
            info!(
                "Forcing reinstall of {} (running {})",
                plan.latest_version, plan.current_version
            );
        }

        let mut manager = InstallManager::new(&self.layout, &self.fs, observer);
        manager.begin_download();

        let outcome = match self.create_scratch() {
            Ok(scratch) => {
                let outcome = self
                    .run_attempt(&mut manager, &plan, &binary, scratch.path(), observer, cancel)
                    .await;
                remove_scratch(scratch);
                outcome
            }
            Err(e) => manager.fail(e),
        };

        Ok(ApplyResult::Completed {
            from: plan.current_version,
            to: plan.latest_version,
            outcome,
        })
    }

    async fn run_attempt(
        &self,
        manager: &mut InstallManager<'_, F>,
        plan: &UpdatePlan,
        binary: &AssetDescriptor,
        scratch: &Path,
        observer: &dyn UpdateObserver,
        cancel: &CancellationToken,
    ) -> InstallOutcome {
        let candidate = scratch.join(CANDIDATE_FILE);
        info!(
            "Downloading {} ({})",
            binary.name,
            human_readable_size(binary.size)
        );

        let mut on_progress = move |progress: &DownloadProgress| observer.on_progress(progress);
        let downloaded = match self
            .downloader
            .download(&binary.browser_download_url, &candidate, &mut on_progress, cancel)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => return manager.fail(e),
        };

        if binary.size > 0 && downloaded != binary.size {
            return manager.fail(UpdateError::SizeMismatch {
                expected: binary.size,
                actual: downloaded,
            });
        }

        let verification = match &plan.checksum {
            Some(checksum) => {
                manager.begin_verify();
                match self
                    .verify(&candidate, binary, checksum, scratch, cancel)
                    .await
                {
                    Ok(digest) => Verification::Verified { digest },
                    Err(e) => return manager.fail(e),
                }
            }
            None => {
                warn!(
                    "Release {} publishes no checksum; {} will be installed unverified",
                    plan.release.tag_name, binary.name
                );
                observer.on_unverified(&binary.name);
                Verification::Unverified
            }
        };

        // The commit window itself is not interruptible
        if cancel.is_cancelled() {
            return manager.fail(UpdateError::Cancelled);
        }

        manager.commit(&candidate, verification)
    }

    async fn verify(
        &self,
        candidate: &Path,
        binary: &AssetDescriptor,
        checksum: &AssetDescriptor,
        scratch: &Path,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let manifest = scratch.join(CHECKSUM_FILE);
        debug!("Fetching checksum {}", checksum.name);
        self.downloader
            .download(
                &checksum.browser_download_url,
                &manifest,
                &mut |_: &DownloadProgress| {},
                cancel,
            )
            .await?;

        // Hashing reads the whole candidate; keep it off the runtime threads
        let candidate = candidate.to_path_buf();
        let binary_name = binary.name.clone();
        let checksum_name = checksum.name.clone();
        let digest = tokio::task::spawn_blocking({
            let candidate = candidate.clone();
            move || IntegrityVerifier::verify(&candidate, &manifest, &binary_name, &checksum_name)
        })
        .await
        .map_err(|e| UpdateError::io_with_path("hash", &candidate, io::Error::other(e)))??;

        info!("Checksum verified: {}", digest);
        Ok(digest)
    }

    fn create_scratch(&self) -> Result<TempDir> {
        let install = &self.config.install;
        let root = install.scratch_dir();

        let scratch = tempfile::Builder::new()
            .prefix(&install.scratch_prefix)
            .tempdir_in(&root)
            .map_err(|e| UpdateError::io_with_path("create scratch directory in", &root, e))?;
        debug!("Scratch directory: {:?}", scratch.path());
        Ok(scratch)
    }
}

fn remove_scratch(scratch: TempDir) {
    let path: PathBuf = scratch.path().to_path_buf();
    match scratch.close() {
        Ok(()) => debug!("Removed scratch directory {:?}", path),
        Err(e) => warn!("Failed to remove scratch directory {:?}: {}", path, e),
    }
}
