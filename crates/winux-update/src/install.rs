//! Backup, install and rollback of the live binary
//!
//! An apply call walks one state machine:
//!
//! ```text
//! Idle -> Downloading -> Verifying -> BackingUp -> Installing -> Done
//!                   \            \            \             \-> RolledBack
//!                    \------------\------------\-----------------> Failed
//! ```
//!
//! Downloading and Verifying only touch the scratch directory. The commit
//! window (BackingUp and Installing) is the only phase that mutates the
//! install path. It runs under an exclusive lock file and always ends with
//! the backup either removed (success) or renamed back (failure).
//!
//! The candidate is copied to a sibling staging file and renamed onto the
//! install path, so whenever the install path exists it holds a complete
//! binary. A backup found next to a complete install is therefore stale and
//! is discarded; a backup with no install beside it is restored.

use fs4::fs_std::FileExt;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use winux_core::types::InstallConfig;

use crate::error::{Result, UpdateError};
use crate::observer::UpdateObserver;
use crate::verify::Verification;

/// States of a single apply call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    Idle,
    Downloading,
    Verifying,
    BackingUp,
    Installing,
    Done,
    RolledBack,
    Failed,
}

impl InstallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::RolledBack | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: InstallState) -> bool {
        use InstallState::*;
        matches!(
            (self, next),
            (Idle, Downloading)
                | (Downloading, Verifying)
                | (Downloading, BackingUp)
                | (Downloading, Failed)
                | (Verifying, BackingUp)
                | (Verifying, Failed)
                | (BackingUp, Installing)
                | (BackingUp, Failed)
                | (Installing, Done)
                | (Installing, RolledBack)
                | (Installing, Failed)
        )
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::BackingUp => "backing up",
            Self::Installing => "installing",
            Self::Done => "done",
            Self::RolledBack => "rolled back",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal result of an apply call
#[derive(Debug)]
pub enum InstallOutcome {
    /// The new binary is installed. `leftover_backup` is set when the old
    /// binary could not be deleted (on Windows, a running executable); the
    /// next commit discards it.
    Done {
        install_path: PathBuf,
        verification: Verification,
        leftover_backup: Option<PathBuf>,
    },
    /// Installing failed and the previous state was restored
    RolledBack {
        install_path: PathBuf,
        backup_path: Option<PathBuf>,
        error: UpdateError,
    },
    /// The update did not happen. When `backup_path` is set the restore
    /// failed too and the backup must be recovered by hand.
    Failed {
        install_path: PathBuf,
        backup_path: Option<PathBuf>,
        error: UpdateError,
    },
}

impl InstallOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn state(&self) -> InstallState {
        match self {
            Self::Done { .. } => InstallState::Done,
            Self::RolledBack { .. } => InstallState::RolledBack,
            Self::Failed { .. } => InstallState::Failed,
        }
    }

    pub fn install_path(&self) -> &Path {
        match self {
            Self::Done { install_path, .. }
            | Self::RolledBack { install_path, .. }
            | Self::Failed { install_path, .. } => install_path,
        }
    }

    pub fn backup_path(&self) -> Option<&Path> {
        match self {
            Self::Done {
                leftover_backup, ..
            } => leftover_backup.as_deref(),
            Self::RolledBack { backup_path, .. } | Self::Failed { backup_path, .. } => {
                backup_path.as_deref()
            }
        }
    }

    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            Self::Done { .. } => None,
            Self::RolledBack { error, .. } | Self::Failed { error, .. } => Some(error),
        }
    }

    /// True when the install path may not hold a runnable binary
    pub fn needs_manual_recovery(&self) -> bool {
        matches!(self, Self::Failed { backup_path: Some(_), .. })
    }
}

const STAGING_SUFFIX: &str = ".new";

/// Paths involved in installing one binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub install_path: PathBuf,
    pub backup_path: PathBuf,
    /// Sibling the candidate is copied to before it is renamed into place
    pub staging_path: PathBuf,
    /// Lives under the scratch root, never in the install directory
    pub lock_path: PathBuf,
}

impl InstallLayout {
    /// Layout for `config.binary_name` inside `install_dir`
    pub fn new(install_dir: &Path, config: &InstallConfig) -> Self {
        let sibling = |suffix: &str| install_dir.join(format!("{}{}", config.binary_name, suffix));
        Self {
            install_path: install_dir.join(&config.binary_name),
            backup_path: sibling(&config.backup_suffix),
            staging_path: sibling(STAGING_SUFFIX),
            lock_path: config.scratch_dir().join(&config.lock_file),
        }
    }

    /// Layout in the configured directory, or next to the running executable
    pub fn resolve(config: &InstallConfig) -> Result<Self> {
        let install_dir = match &config.install_dir {
            Some(dir) => dir.clone(),
            None => {
                let exe = std::env::current_exe().map_err(|e| {
                    UpdateError::io_with_path("locate running executable", Path::new("."), e)
                })?;
                exe.parent().map(Path::to_path_buf).ok_or_else(|| {
                    UpdateError::io_with_path(
                        "resolve install directory of",
                        &exe,
                        io::Error::new(io::ErrorKind::NotFound, "executable has no parent"),
                    )
                })?
            }
        };
        Ok(Self::new(&install_dir, config))
    }
}

/// Filesystem operations used by the commit window
pub trait InstallFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Copy `from` to `to`, leaving `to` executable
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl InstallFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(to, std::fs::Permissions::from_mode(0o755))?;
        }

        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Exclusive lock held for the commit window, released on drop
struct CommitLock {
    _file: File,
    path: PathBuf,
}

impl CommitLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| UpdateError::io_with_path("open lock file", path, e))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(true) => {
                debug!("Commit lock acquired: {:?}", path);
                Ok(Self {
                    _file: file,
                    path: path.to_path_buf(),
                })
            }
            Ok(false) => Err(UpdateError::Locked {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(UpdateError::io_with_path("lock", path, e)),
        }
    }
}

impl Drop for CommitLock {
    fn drop(&mut self) {
        debug!("Commit lock released: {:?}", self.path);
    }
}

/// Drives one apply call through the install state machine
pub struct InstallManager<'a, F: InstallFs> {
    layout: &'a InstallLayout,
    fs: &'a F,
    observer: &'a dyn UpdateObserver,
    state: InstallState,
}

impl<'a, F: InstallFs> InstallManager<'a, F> {
    pub fn new(layout: &'a InstallLayout, fs: &'a F, observer: &'a dyn UpdateObserver) -> Self {
        Self {
            layout,
            fs,
            observer,
            state: InstallState::Idle,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn layout(&self) -> &InstallLayout {
        self.layout
    }

    fn advance(&mut self, next: InstallState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!("Install state: {} -> {}", self.state, next);
        self.state = next;
        self.observer.on_state(next);
    }

    /// Idle -> Downloading
    pub fn begin_download(&mut self) {
        self.advance(InstallState::Downloading);
    }

    /// Downloading -> Verifying
    pub fn begin_verify(&mut self) {
        self.advance(InstallState::Verifying);
    }

    /// Fail during the prepare phase. The install path was never touched.
    pub fn fail(&mut self, error: UpdateError) -> InstallOutcome {
        warn!("Update aborted before touching {:?}: {}", self.layout.install_path, error);
        self.advance(InstallState::Failed);
        InstallOutcome::Failed {
            install_path: self.layout.install_path.clone(),
            backup_path: None,
            error,
        }
    }

    /// Run the commit window: back up the live binary, move `candidate`
    /// into place and remove the backup, rolling back on failure.
    pub fn commit(&mut self, candidate: &Path, verification: Verification) -> InstallOutcome {
        self.advance(InstallState::BackingUp);

        let _lock = match CommitLock::acquire(&self.layout.lock_path) {
            Ok(lock) => lock,
            Err(e) => return self.fail_commit(None, e),
        };

        if let Err(e) = self.recover_interrupted() {
            // Only a backup with no install beside it needs a human
            let layout = self.layout;
            let stranded =
                self.fs.exists(&layout.backup_path) && !self.fs.exists(&layout.install_path);
            let backup = stranded.then(|| layout.backup_path.clone());
            return self.fail_commit(backup, e);
        }

        let backup = match self.back_up() {
            Ok(backup) => backup,
            Err(e) => return self.fail_commit(None, e),
        };

        self.advance(InstallState::Installing);
        if let Err(install_error) = self.install(candidate) {
            return self.roll_back(backup, install_error);
        }

        let leftover_backup = backup.and_then(|backup_path| {
            match self.fs.remove_file(&backup_path) {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        "Installed, but the previous binary at {:?} could not be removed: {}. \
                         It will be discarded by the next update",
                        backup_path, e
                    );
                    Some(backup_path)
                }
            }
        });

        info!("Installed {:?}", self.layout.install_path);
        self.advance(InstallState::Done);
        InstallOutcome::Done {
            install_path: self.layout.install_path.clone(),
            verification,
            leftover_backup,
        }
    }

    /// Clear what an earlier commit left behind.
    ///
    /// A backup beside a complete install is stale and is deleted. A backup
    /// with nothing at the install path is the last known-good binary of an
    /// interrupted commit and is put back. A staging file is always partial.
    fn recover_interrupted(&self) -> Result<()> {
        let layout = self.layout;

        if self.fs.exists(&layout.staging_path) {
            debug!("Removing leftover staging file {:?}", layout.staging_path);
            self.fs
                .remove_file(&layout.staging_path)
                .map_err(|e| UpdateError::io_with_path("remove", &layout.staging_path, e))?;
        }

        if !self.fs.exists(&layout.backup_path) {
            return Ok(());
        }

        if self.fs.exists(&layout.install_path) {
            info!("Discarding stale backup {:?}", layout.backup_path);
            return self
                .fs
                .remove_file(&layout.backup_path)
                .map_err(|e| {
                    UpdateError::io_with_path("remove stale backup", &layout.backup_path, e)
                });
        }

        warn!(
            "Found backup from an interrupted update, restoring {:?}",
            layout.backup_path
        );
        self.fs
            .rename(&layout.backup_path, &layout.install_path)
            .map_err(|e| UpdateError::io_with_path("restore backup", &layout.backup_path, e))
    }

    /// Rename the live binary to the backup path. No-op on first install.
    fn back_up(&self) -> Result<Option<PathBuf>> {
        let layout = self.layout;
        if !self.fs.exists(&layout.install_path) {
            debug!("No binary at {:?}, first-time install", layout.install_path);
            return Ok(None);
        }

        self.fs
            .rename(&layout.install_path, &layout.backup_path)
            .map_err(|e| UpdateError::io_with_path("back up", &layout.install_path, e))?;
        debug!("Backup created: {:?}", layout.backup_path);
        Ok(Some(layout.backup_path.clone()))
    }

    /// Copy the candidate to the staging path, then rename it into place
    fn install(&self, candidate: &Path) -> Result<()> {
        let layout = self.layout;
        debug!("Installing {:?} -> {:?}", candidate, layout.install_path);

        self.fs
            .copy(candidate, &layout.staging_path)
            .map_err(|e| UpdateError::io_with_path("copy new binary to", &layout.staging_path, e))?;
        self.fs
            .rename(&layout.staging_path, &layout.install_path)
            .map_err(|e| UpdateError::io_with_path("move new binary to", &layout.install_path, e))
    }

    fn roll_back(&mut self, backup: Option<PathBuf>, install_error: UpdateError) -> InstallOutcome {
        let install_path = self.layout.install_path.clone();
        let staging_path = &self.layout.staging_path;
        warn!("Install failed, rolling back: {}", install_error);

        if self.fs.exists(staging_path) {
            if let Err(e) = self.fs.remove_file(staging_path) {
                debug!("Could not remove staging file {:?}: {}", staging_path, e);
            }
        }

        let Some(backup_path) = backup else {
            self.advance(InstallState::RolledBack);
            return InstallOutcome::RolledBack {
                install_path,
                backup_path: None,
                error: install_error,
            };
        };

        match self.fs.rename(&backup_path, &install_path) {
            Ok(()) => {
                info!("Rollback completed, restored {:?}", install_path);
                self.advance(InstallState::RolledBack);
                InstallOutcome::RolledBack {
                    install_path,
                    backup_path: Some(backup_path),
                    error: install_error,
                }
            }
            Err(e) => {
                let restore_error = UpdateError::io_with_path("restore backup", &backup_path, e);
                error!(
                    "Rollback failed. Install error: {}. Restore error: {}. Backup kept at {:?}",
                    install_error, restore_error, backup_path
                );
                self.advance(InstallState::Failed);
                InstallOutcome::Failed {
                    install_path: install_path.clone(),
                    backup_path: Some(backup_path.clone()),
                    error: UpdateError::RollbackFailed {
                        install_error: Box::new(install_error),
                        restore_error: Box::new(restore_error),
                        install_path,
                        backup_path,
                    },
                }
            }
        }
    }

    fn fail_commit(&mut self, backup_path: Option<PathBuf>, error: UpdateError) -> InstallOutcome {
        error!("Commit aborted: {}", error);
        self.advance(InstallState::Failed);
        InstallOutcome::Failed {
            install_path: self.layout.install_path.clone(),
            backup_path,
            error,
        }
    }
}
