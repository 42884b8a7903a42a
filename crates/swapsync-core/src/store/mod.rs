//! Loading, backing up and persisting the config file.
//!
//! - `document` - parsed document with opaque extra sections
//! - `atomic` - temp-file-and-rename writer
//! - `backup` - rotating timestamped snapshots

pub mod atomic;
pub mod backup;
pub mod document;

pub use backup::BackupSet;
pub use document::ConfigDocument;

use crate::config::{sibling_path, SyncDefaults};
use crate::error::{Result, SyncError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads and writes one config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    dry_run: bool,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            path: path.into(),
            dry_run,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<config>.tmp`
    pub fn temp_path(&self) -> PathBuf {
        sibling_path(&self.path, SyncDefaults::TEMP_SUFFIX)
    }

    /// Load the document. A missing file yields an empty document.
    pub fn load(&self) -> Result<ConfigDocument> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Config file not found at '{}'. A new one will be created.",
                    self.path.display()
                );
                return Ok(ConfigDocument::new());
            }
            Err(e) => {
                return Err(SyncError::Io {
                    message: format!("Failed to read config file {}", self.path.display()),
                    path: Some(self.path.clone()),
                    source: Some(e),
                })
            }
        };
        ConfigDocument::parse(&text, &self.path)
    }

    /// Persist the document atomically. In dry-run mode only logs.
    pub fn save(&self, document: &ConfigDocument) -> Result<()> {
        if self.dry_run {
            info!("DRY RUN: Would save changes to '{}'", self.path.display());
            return Ok(());
        }
        let text = document.to_yaml()?;
        atomic::atomic_write(&self.path, &self.temp_path(), text.as_bytes())?;
        info!("Successfully updated '{}'", self.path.display());
        Ok(())
    }

    /// Rotate backups, keeping at most `retention` snapshots.
    pub fn rotate_backups(&self, retention: usize) -> Result<Option<PathBuf>> {
        BackupSet::new(&self.path).rotate(retention, self.dry_run)
    }
}
