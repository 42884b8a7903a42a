//! Cross-process mutual exclusion via a `<config>.lock` file.
//!
//! The lock file is created with `create_new`, so two processes racing for it
//! cannot both succeed. It holds the owner's PID for diagnostics and is
//! removed when the guard is dropped. A process killed without unwinding
//! leaves the file behind; it has to be removed by hand.

use crate::config::{sibling_path, SyncDefaults};
use crate::error::{Result, SyncError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Guard for an acquired lock file.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    released: bool,
}

impl ProcessLock {
    /// Acquire the lock for `config_path`.
    ///
    /// Fails immediately with [`SyncError::AlreadyLocked`] if another run
    /// holds it.
    pub fn acquire(config_path: &Path) -> Result<Self> {
        Self::acquire_at(sibling_path(config_path, SyncDefaults::LOCK_SUFFIX))
    }

    /// Acquire a lock file at an explicit path.
    pub fn acquire_at(lock_path: impl Into<PathBuf>) -> Result<Self> {
        let path = lock_path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| SyncError::io_with_path(e, parent))?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                return Err(SyncError::AlreadyLocked {
                    lock_path: path,
                    holder,
                });
            }
            Err(e) => return Err(SyncError::io_with_path(e, &path)),
        };

        // From here on the guard owns the file and removes it on any exit.
        let lock = Self {
            path,
            released: false,
        };
        write!(file, "{}", std::process::id())
            .and_then(|()| file.flush())
            .map_err(|e| SyncError::io_with_path(e, &lock.path))?;

        debug!("Acquired lock {}", lock.path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting a failure to remove the file.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Lock file '{}' removed", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::io_with_path(e, &self.path)),
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Lock file '{}' removed", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove lock file '{}': {}", self.path.display(), e),
        }
    }
}
