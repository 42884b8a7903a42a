//! One reconciliation run, end to end.
//!
//! Order of operations:
//!
//! 1. Acquire `<config>.lock`
//! 2. Load the config
//! 3. Scan the models directory and derive keys (collisions stop here)
//! 4. Audit existing entries
//! 5. Add and prune entries
//! 6. If anything changed, rotate backups and save
//! 7. Restart the serving container, if saved
//! 8. Release the lock
//!
//! Nothing on disk is written before step 6, so a run that fails earlier or
//! finds nothing to do leaves the config and its backups alone.

use crate::config::SyncConfig;
use crate::discovery::{ArtifactPath, ModelDiscovery, ModelKey, ScanResult};
use crate::entry::{audit, EntryTemplate};
use crate::error::Result;
use crate::lock::ProcessLock;
use crate::notify::{RestartNotifier, RestartOutcome};
use crate::reconcile::reconcile;
use crate::store::ConfigStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a run did, or in dry-run mode would have done.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub added: Vec<ModelKey>,
    pub updated: Vec<ModelKey>,
    pub repaired: Vec<ModelKey>,
    pub removed: Vec<ModelKey>,
    /// Entries without a file, kept because pruning is off
    pub stale: Vec<ModelKey>,
    /// Discovered paths that failed validation
    pub rejected_paths: Vec<String>,
    /// Whether the config file was rewritten
    pub saved: bool,
    pub dry_run: bool,
    pub backup: Option<PathBuf>,
    pub restart: RestartOutcome,
}

impl SyncReport {
    /// Number of entries added, updated, repaired or removed.
    pub fn changes(&self) -> usize {
        self.added.len() + self.updated.len() + self.repaired.len() + self.removed.len()
    }
}

/// Artifacts on disk and the keys they map to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    pub models: BTreeMap<ModelKey, ArtifactPath>,
    pub rejected: Vec<String>,
}

/// Scan the models directory and derive a key for every artifact.
///
/// A missing or unreadable directory is logged and treated as empty. Key
/// collisions are returned as [`SyncError::KeyCollision`](crate::SyncError::KeyCollision).
pub fn discover(config: &SyncConfig) -> Result<Inventory> {
    let scan = scan_models(config)?;
    let template = EntryTemplate::from_config(config);
    let models = template.keys().derive_all(&scan.artifacts)?;
    Ok(Inventory {
        models,
        rejected: scan.rejected,
    })
}

fn scan_models(config: &SyncConfig) -> Result<ScanResult> {
    let mut discovery = ModelDiscovery::new(&config.models_dir);
    if !config.collapse_shards {
        discovery = discovery.keep_shards();
    }
    match discovery.scan() {
        Ok(scan) => Ok(scan),
        Err(e) if e.is_environmental() => {
            warn!("{}. Treating the models directory as empty.", e);
            Ok(ScanResult::default())
        }
        Err(e) => Err(e),
    }
}

/// Runs reconciliation for one config file.
///
/// # Example
///
/// ```no_run
/// use swapsync_core::{DockerCliNotifier, ModelSync, SyncConfig};
///
/// let config = SyncConfig::new("/srv/llama-swap/config.yaml", "/srv/models").with_prune(true);
/// let notifier = DockerCliNotifier::default();
/// let report = ModelSync::new(&config, &notifier).run()?;
/// println!("{} changes", report.changes());
/// # Ok::<(), swapsync_core::SyncError>(())
/// ```
pub struct ModelSync<'a, N: RestartNotifier + ?Sized> {
    config: &'a SyncConfig,
    notifier: &'a N,
}

impl<'a, N: RestartNotifier + ?Sized> ModelSync<'a, N> {
    pub fn new(config: &'a SyncConfig, notifier: &'a N) -> Self {
        Self { config, notifier }
    }

    /// Execute the run under the config's lock.
    ///
    /// State errors (lock held, corrupt config, key collision) are returned
    /// before anything is written. A failed restart is reported in the
    /// [`SyncReport`], not as an error.
    pub fn run(&self) -> Result<SyncReport> {
        self.config.validate()?;
        if self.config.dry_run {
            info!("--- DRY RUN MODE: No changes will be written ---");
        }

        let lock = ProcessLock::acquire(&self.config.config_path)?;
        let result = self.run_locked();
        if let Err(e) = lock.release() {
            warn!("{}", e);
        }
        result
    }

    fn run_locked(&self) -> Result<SyncReport> {
        let config = self.config;
        let store = ConfigStore::new(&config.config_path, config.dry_run);
        let mut report = SyncReport {
            dry_run: config.dry_run,
            ..SyncReport::default()
        };

        info!("--- Loading configuration ---");
        let mut document = store.load()?;
        info!(
            "Loaded {} entries from '{}'",
            document.models().len(),
            config.config_path.display()
        );

        let inventory = discover(config)?;
        info!("Found {} model files on disk", inventory.models.len());
        report.rejected_paths = inventory.rejected;

        let template = EntryTemplate::from_config(config);
        let audited = audit(document.models_mut(), &template, &inventory.models);
        let reconciled = reconcile(
            document.models_mut(),
            &inventory.models,
            &template,
            config.prune,
        );

        report.updated = audited.updated;
        report.repaired = audited.repaired;
        report.added = reconciled.added;
        report.removed = reconciled.removed;
        report.stale = reconciled.stale;

        if report.changes() == 0 {
            info!("--- No changes needed. Configuration is already up to date. ---");
            return Ok(report);
        }

        // The file on disk still holds the pre-change state here.
        report.backup = store.rotate_backups(config.max_backups)?;

        info!("--- Saving Changes ---");
        store.save(&document)?;
        report.saved = !config.dry_run;
        info!(
            "Summary: {} added, {} updated, {} removed.",
            report.added.len(),
            report.updated.len() + report.repaired.len(),
            report.removed.len()
        );

        report.restart = self.restart();
        Ok(report)
    }

    fn restart(&self) -> RestartOutcome {
        if !self.config.restart {
            info!("Restart disabled; skipping container restart");
            return RestartOutcome::Skipped {
                reason: "restart disabled".to_string(),
            };
        }
        let Some(target) = self.config.restart_target.as_deref() else {
            info!("No restart target configured; skipping container restart");
            return RestartOutcome::Skipped {
                reason: "no restart target".to_string(),
            };
        };
        if self.config.dry_run {
            info!("DRY RUN: Would restart container '{}'", target);
            return RestartOutcome::DryRun;
        }

        info!("Restarting container '{}'", target);
        match self.notifier.restart(target) {
            Ok(()) => RestartOutcome::Restarted,
            Err(e) => {
                error!("{}. The saved config was kept.", e);
                RestartOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
