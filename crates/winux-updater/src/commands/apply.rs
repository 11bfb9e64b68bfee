//! Apply and force commands

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::sync::Mutex;
use winux_core::UpdaterConfig;
use winux_update::{
    ApplyOptions, ApplyResult, CancellationToken, DownloadProgress, InstallOutcome, InstallState,
    TracingObserver, UpdateError, UpdateObserver, UpdatePipeline, Verification, VERSION,
};

use crate::output;

pub async fn run(force: bool, config: UpdaterConfig) -> Result<()> {
    let pipeline = UpdatePipeline::new(config, VERSION).context("Failed to initialize updater")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    if force {
        output::info("Forcing reinstall of the latest release");
    }

    let observer = ConsoleObserver::default();
    let result = pipeline
        .apply(ApplyOptions { force }, &observer, &cancel)
        .await;
    observer.clear();
    watcher.abort();

    report(result.context("Update failed")?)
}

fn report(result: ApplyResult) -> Result<()> {
    let (from, to, outcome) = match result {
        ApplyResult::UpToDate { version } => {
            output::success(&format!("Already up to date ({})", version));
            return Ok(());
        }
        ApplyResult::Completed { from, to, outcome } => (from, to, outcome),
    };

    match outcome {
        InstallOutcome::Done {
            install_path,
            verification,
            leftover_backup,
        } => {
            output::success(&format!("Updated {} -> {}", from, to));
            output::kv("Installed", &install_path.display().to_string());
            match verification {
                Verification::Verified { digest } => output::kv("SHA-256", &digest),
                Verification::Unverified => {
                    output::warning("The release published no checksum; the binary was not verified")
                }
            }
            if let Some(backup) = leftover_backup {
                output::info(&format!(
                    "The previous binary at {} is still in use and will be removed by the next update",
                    backup.display()
                ));
            }
            Ok(())
        }
        InstallOutcome::RolledBack {
            install_path,
            error,
            ..
        } => {
            output::error(&format!("Install failed: {}", error));
            output::info(&format!(
                "Rolled back; {} is unchanged",
                install_path.display()
            ));
            bail!("update to {} was rolled back", to)
        }
        InstallOutcome::Failed {
            install_path,
            backup_path,
            error,
        } => {
            match &error {
                UpdateError::RollbackFailed {
                    install_error,
                    restore_error,
                    ..
                } => {
                    output::error("Install failed and the previous binary could not be restored");
                    output::kv("Install error", &install_error.to_string());
                    output::kv("Restore error", &restore_error.to_string());
                }
                other => output::error(&format!("Update failed: {}", other)),
            }

            if let Some(backup) = backup_path {
                output::warning(&format!(
                    "The previous binary is kept at {}. Copy it to {} to recover.",
                    backup.display(),
                    install_path.display()
                ));
            }
            bail!("update to {} failed", to)
        }
    }
}

/// Renders state changes and a download bar, and forwards every event to
/// the tracing log.
#[derive(Default)]
struct ConsoleObserver {
    bar: Mutex<Option<ProgressBar>>,
    log: TracingObserver,
}

impl ConsoleObserver {
    fn clear(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl UpdateObserver for ConsoleObserver {
    fn on_state(&self, state: InstallState) {
        self.log.on_state(state);
        match state {
            InstallState::Downloading => output::info("Downloading update..."),
            InstallState::Verifying => {
                self.clear();
                output::info("Verifying checksum...");
            }
            InstallState::BackingUp => {
                self.clear();
                output::info("Backing up current binary...");
            }
            InstallState::Installing => output::info("Installing..."),
            InstallState::Idle
            | InstallState::Done
            | InstallState::RolledBack
            | InstallState::Failed => self.clear(),
        }
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        self.log.on_progress(progress);
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| output::download_bar("downloading"));
        if progress.total_bytes > 0 {
            bar.set_length(progress.total_bytes);
        }
        bar.set_position(progress.downloaded_bytes);
    }

    fn on_unverified(&self, asset: &str) {
        self.log.on_unverified(asset);
        output::warning(&format!(
            "No checksum published for {}; it will be installed unverified",
            asset
        ));
    }
}
