//! Update observation and logging
//!
//! This module provides the `UpdateObserver` trait for following an apply
//! call as it moves through the install state machine, and a
//! `TracingObserver` implementation that logs using the `tracing` crate.

use crate::download::{human_readable_size, DownloadProgress};
use crate::install::InstallState;

/// Observer trait for update events
///
/// All hooks default to doing nothing, so a presentation layer only
/// implements what it renders.
///
/// # Example
///
/// ```rust
/// use winux_update::{DownloadProgress, InstallState, UpdateObserver};
///
/// struct StepPrinter;
///
/// impl UpdateObserver for StepPrinter {
///     fn on_state(&self, state: InstallState) {
///         println!("-> {}", state);
///     }
/// }
/// ```
pub trait UpdateObserver: Send + Sync {
    /// Called on every state transition, terminal states included
    fn on_state(&self, state: InstallState) {
        let _ = state;
    }

    /// Called with rate-limited download progress
    fn on_progress(&self, progress: &DownloadProgress) {
        let _ = progress;
    }

    /// Called when the release publishes no checksum for `asset`
    fn on_unverified(&self, asset: &str) {
        let _ = asset;
    }
}

/// An observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl UpdateObserver for NoOpObserver {}

/// An observer that logs update events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_state`: INFO, WARN for `RolledBack`, ERROR for `Failed`
/// - `on_progress`: TRACE
/// - `on_unverified`: WARN
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_state(&self, state: InstallState) {
        match state {
            InstallState::RolledBack => tracing::warn!(state = %state, "update rolled back"),
            InstallState::Failed => tracing::error!(state = %state, "update failed"),
            _ => tracing::info!(state = %state, "update state changed"),
        }
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        tracing::trace!(
            downloaded = %human_readable_size(progress.downloaded_bytes),
            total = %human_readable_size(progress.total_bytes),
            "download progress"
        );
    }

    fn on_unverified(&self, asset: &str) {
        tracing::warn!(
            asset = %asset,
            "release publishes no checksum; installing unverified binary"
        );
    }
}
