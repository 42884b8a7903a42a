//! Disk-to-config diff: add new models, optionally prune missing ones.

use crate::discovery::{ArtifactPath, ModelKey};
use crate::entry::{EntrySlot, EntryTemplate, ModelTable};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Keys changed by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<ModelKey>,
    pub removed: Vec<ModelKey>,
    /// Entries without a file that were kept because pruning is off
    pub stale: Vec<ModelKey>,
}

impl ReconcileReport {
    /// `(added, removed)`
    pub fn counts(&self) -> (usize, usize) {
        (self.added.len(), self.removed.len())
    }
}

/// Bring the key set of `models` in line with `on_disk`.
///
/// New keys are added in lexicographic order. Keys present on both sides are
/// left to the audit.
pub fn reconcile(
    models: &mut ModelTable,
    on_disk: &BTreeMap<ModelKey, ArtifactPath>,
    template: &EntryTemplate,
    prune: bool,
) -> ReconcileReport {
    info!("--- Syncing with models directory ---");
    let mut report = ReconcileReport::default();

    for (key, path) in on_disk {
        if models.contains(key.as_str()) {
            continue;
        }
        info!("ADDING: New model file found: '{}' as '{}'", path, key);
        models.insert(
            key.clone(),
            EntrySlot::Valid(template.build_for(key, path.as_str())),
        );
        report.added.push(key.clone());
    }

    let mut stale: Vec<ModelKey> = models
        .keys()
        .filter(|key| !on_disk.contains_key(*key))
        .cloned()
        .collect();
    stale.sort();

    for key in stale {
        if prune {
            info!("REMOVING: Stale entry '{}'", key);
            models.remove(key.as_str());
            report.removed.push(key);
        } else {
            warn!(
                "Stale entry '{}' found (no matching file). Use --prune to remove.",
                key
            );
            report.stale.push(key);
        }
    }

    report
}
