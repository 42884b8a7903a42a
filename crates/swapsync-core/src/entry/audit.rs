//! Backfill of missing fields in existing entries.
//!
//! Present fields are never rewritten, whatever they contain. Only a value
//! that is not a mapping at all is replaced wholesale.

use crate::discovery::{ArtifactPath, ModelKey};
use crate::entry::model::{value_kind, EntryField, EntrySlot};
use crate::entry::table::ModelTable;
use crate::entry::template::EntryTemplate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Keys touched by one audit pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    /// Entries that gained missing fields
    pub updated: Vec<ModelKey>,
    /// Entries that were not mappings and were rebuilt from the template
    pub repaired: Vec<ModelKey>,
}

impl AuditReport {
    /// Number of entries changed.
    pub fn changed(&self) -> usize {
        self.updated.len() + self.repaired.len()
    }
}

/// Audit every entry in `models`.
///
/// `on_disk` supplies the real artifact path for keys that still have a file;
/// other keys fall back to [`ModelKey::implied_path`] when a template is built.
pub fn audit(
    models: &mut ModelTable,
    template: &EntryTemplate,
    on_disk: &BTreeMap<ModelKey, ArtifactPath>,
) -> AuditReport {
    info!("--- Auditing existing config entries ---");
    let mut report = AuditReport::default();

    for (key, slot) in models.iter_mut() {
        let defaults = || match on_disk.get(key) {
            Some(path) => template.build_for(key, path.as_str()),
            None => template.build_for(key, &key.implied_path()),
        };

        match slot {
            EntrySlot::Malformed(raw) => {
                warn!(
                    "REPAIRING: Entry '{}' is a {} instead of a mapping; replacing it with defaults",
                    key,
                    value_kind(raw)
                );
                *slot = EntrySlot::Valid(defaults());
                report.repaired.push(key.clone());
            }
            EntrySlot::Valid(entry) => {
                let missing = entry.missing_fields();
                if missing.is_empty() {
                    continue;
                }
                entry.fill_from(&defaults(), &missing);
                info!(
                    "UPDATING: Entry '{}' was missing {}; defaults added",
                    key,
                    field_list(&missing)
                );
                report.updated.push(key.clone());
            }
        }
    }

    if report.changed() == 0 {
        info!("All existing entries are structurally complete");
    }
    report
}

fn field_list(fields: &[EntryField]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
