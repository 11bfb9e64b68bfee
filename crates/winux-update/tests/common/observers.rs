//! Recording observer and fault-injecting filesystems

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use winux_update::{DownloadProgress, InstallFs, InstallState, OsFs, UpdateObserver};

/// Records every event an apply call emits
#[derive(Default)]
pub struct RecordingObserver {
    states: Mutex<Vec<InstallState>>,
    unverified: Mutex<Vec<String>>,
    progress_events: AtomicUsize,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<InstallState> {
        self.states.lock().unwrap().clone()
    }

    pub fn unverified(&self) -> Vec<String> {
        self.unverified.lock().unwrap().clone()
    }

    pub fn progress_events(&self) -> usize {
        self.progress_events.load(Ordering::SeqCst)
    }
}

impl UpdateObserver for RecordingObserver {
    fn on_state(&self, state: InstallState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_progress(&self, _progress: &DownloadProgress) {
        self.progress_events.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unverified(&self, asset: &str) {
        self.unverified.lock().unwrap().push(asset.to_string());
    }
}

/// Real filesystem whose copy into the install path always fails
#[derive(Debug, Default)]
pub struct UnwritableInstallFs;

impl InstallFs for UnwritableInstallFs {
    fn exists(&self, path: &Path) -> bool {
        OsFs.exists(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        OsFs.rename(from, to)
    }

    fn copy(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "destination is not writable",
        ))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        OsFs.remove_file(path)
    }
}

/// Real filesystem that cannot delete the backup of the running binary
#[derive(Debug, Default)]
pub struct UndeletableBackupFs;

impl InstallFs for UndeletableBackupFs {
    fn exists(&self, path: &Path) -> bool {
        OsFs.exists(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        OsFs.rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        OsFs.copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let is_backup = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(".backup"));
        if is_backup {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is in use by another process",
            ));
        }
        OsFs.remove_file(path)
    }
}
