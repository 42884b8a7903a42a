//! Atomic file replacement.
//!
//! 1. Write to `<config>.tmp`
//! 2. fsync
//! 3. Rename over the destination
//!
//! On any failure the temp file is removed and the destination is left as it
//! was.

use crate::error::{Result, SyncError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Replace `path` with `contents`, staging through `temp_path`.
pub fn atomic_write(path: &Path, temp_path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write_with(path, temp_path, contents, |from, to| fs::rename(from, to))
}

/// As [`atomic_write`], with the final commit step supplied by the caller.
pub(crate) fn atomic_write_with<F>(
    path: &Path,
    temp_path: &Path,
    contents: &[u8],
    commit: F,
) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| SyncError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let result = write_temp(path, temp_path, contents).and_then(|()| {
        commit(temp_path, path).map_err(|e| SyncError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })
    });

    if let Err(err) = result {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
            }
        }
        return Err(err);
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn write_temp(path: &Path, temp_path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| SyncError::Io {
            message: format!("Failed to create temp file {}", temp_path.display()),
            path: Some(temp_path.to_path_buf()),
            source: Some(e),
        })?;

    file.write_all(contents).map_err(|e| SyncError::Io {
        message: format!("Failed to write temp file {}", temp_path.display()),
        path: Some(temp_path.to_path_buf()),
        source: Some(e),
    })?;

    file.sync_all().map_err(|e| SyncError::Io {
        message: format!("Failed to sync temp file {}", temp_path.display()),
        path: Some(temp_path.to_path_buf()),
        source: Some(e),
    })?;

    // Keep the operator's permissions on the replaced file.
    if let Ok(metadata) = fs::metadata(path) {
        if let Err(e) = fs::set_permissions(temp_path, metadata.permissions()) {
            debug!("Could not copy permissions onto {}: {}", temp_path.display(), e);
        }
    }

    Ok(())
}
