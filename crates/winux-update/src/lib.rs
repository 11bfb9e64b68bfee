//! Self-update engine for WINUX
//!
//! Provides:
//! - Lenient dotted version comparison
//! - Latest-release resolution against a GitHub-compatible registry
//! - Streaming downloads with rate-limited progress and cancellation
//! - SHA-256 verification against a published checksum manifest
//! - Backup, install and rollback of the live binary under a commit lock
//! - A deferred background check with exactly-once delivery

pub mod background;
pub mod download;
pub mod error;
pub mod install;
pub mod notification;
pub mod observer;
pub mod pipeline;
pub mod releases;
pub mod verify;
pub mod version;

pub use background::BackgroundCheck;
pub use download::{human_readable_size, DownloadProgress, Downloader};
pub use error::{Result, UpdateError};
pub use install::{InstallFs, InstallLayout, InstallManager, InstallOutcome, InstallState, OsFs};
pub use notification::{summarize_notes, UpdateInfo};
pub use observer::{NoOpObserver, TracingObserver, UpdateObserver};
pub use pipeline::{ApplyOptions, ApplyResult, UpdatePipeline};
pub use releases::{AssetDescriptor, ReleaseDescriptor, ReleaseResolver, UpdatePlan};
pub use verify::{IntegrityVerifier, Verification};
pub use version::{compare_versions, ReleaseVersion};

pub use tokio_util::sync::CancellationToken;

/// Version of the running updater
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
