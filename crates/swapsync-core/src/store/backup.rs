//! Timestamped snapshots of the config file.

use crate::config::{sibling_path, SyncDefaults};
use crate::error::{Result, SyncError};
use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info};

/// `YYYYmmdd_HHMMSS_micros`, with an optional `-n` clash suffix.
static SNAPSHOT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}_\d{6}_\d{6}(-\d+)?$").unwrap());

/// The `<config>.bak.<timestamp>` files next to one config file.
#[derive(Debug, Clone)]
pub struct BackupSet {
    config_path: PathBuf,
}

impl BackupSet {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Existing snapshots, oldest first.
    ///
    /// Only names this set generates are listed, so hand-made copies such as
    /// `config.yaml.bak.manual` are never evicted.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let Some(file_name) = self.config_path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{}{}", file_name, SyncDefaults::BACKUP_INFIX);

        let dir = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SyncError::io_with_path(e, &dir)),
        };

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(&prefix))
                    .is_some_and(|suffix| SNAPSHOT_SUFFIX.is_match(suffix))
            })
            .map(|entry| entry.path())
            .collect();
        backups.sort();
        Ok(backups)
    }

    /// Evict the oldest snapshots, then snapshot the current file.
    ///
    /// Leaves at most `retention` snapshots. `retention == 0` disables backups.
    /// A missing config file is not an error. Failures to delete or copy a
    /// single snapshot are logged and do not stop the run.
    pub fn rotate(&self, retention: usize, dry_run: bool) -> Result<Option<PathBuf>> {
        info!("--- Managing backups ---");
        if retention == 0 {
            debug!("Backups disabled");
            return Ok(None);
        }
        if !self.config_path.exists() {
            info!(
                "Config file '{}' does not exist. Skipping backup.",
                self.config_path.display()
            );
            return Ok(None);
        }

        let mut existing = self.list()?;
        while existing.len() >= retention {
            let oldest = existing.remove(0);
            if dry_run {
                info!("DRY RUN: Would remove oldest backup: {}", oldest.display());
                continue;
            }
            match fs::remove_file(&oldest) {
                Ok(()) => info!("Removed oldest backup: {}", oldest.display()),
                Err(e) => error!("Failed to remove backup '{}': {}", oldest.display(), e),
            }
        }

        let snapshot = self.next_snapshot_path();
        if dry_run {
            info!("DRY RUN: Would create backup: {}", snapshot.display());
            return Ok(None);
        }
        match fs::copy(&self.config_path, &snapshot) {
            Ok(_) => {
                info!("Backup created: {}", snapshot.display());
                Ok(Some(snapshot))
            }
            Err(e) => {
                error!("Failed to create backup '{}': {}", snapshot.display(), e);
                Ok(None)
            }
        }
    }

    fn next_snapshot_path(&self) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let base = snapshot_path(&self.config_path, &timestamp);
        let mut candidate = base.clone();
        let mut n = 1;
        while candidate.exists() {
            candidate = sibling_path(&base, &format!("-{n}"));
            n += 1;
        }
        candidate
    }
}

fn snapshot_path(config_path: &Path, timestamp: &str) -> PathBuf {
    sibling_path(
        config_path,
        &format!("{}{}", SyncDefaults::BACKUP_INFIX, timestamp),
    )
}
