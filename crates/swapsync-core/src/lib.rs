//! swapsync core - keeps a llama-swap style YAML config in step with a
//! directory of GGUF model files.
//!
//! A run scans the models directory, derives a stable key for every model
//! file, backfills missing fields in existing entries without touching
//! anything an operator wrote, adds entries for new files, optionally prunes
//! entries whose file is gone, and writes the config back atomically under a
//! cross-process lock.
//!
//! # Example
//!
//! ```no_run
//! use swapsync_core::{DockerCliNotifier, ModelSync, SyncConfig};
//!
//! fn main() -> swapsync_core::Result<()> {
//!     let config = SyncConfig::new("./config.yaml", "./models").with_dry_run(true);
//!     let report = ModelSync::new(&config, &DockerCliNotifier::default()).run()?;
//!     println!("{} added, {} removed", report.added.len(), report.removed.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod lock;
pub mod notify;
pub mod reconcile;
pub mod store;
pub mod sync;

pub use config::{SyncConfig, SyncDefaults};
pub use discovery::{validate, ArtifactPath, KeyGenerator, ModelDiscovery, ModelKey, ScanResult};
pub use entry::{audit, AuditReport, EntryField, EntrySlot, EntryTemplate, ModelEntry, ModelTable};
pub use error::{ErrorKind, Result, SyncError};
pub use lock::ProcessLock;
pub use notify::{DockerCliNotifier, NoopNotifier, RestartNotifier, RestartOutcome};
pub use reconcile::{reconcile, ReconcileReport};
pub use store::{BackupSet, ConfigDocument, ConfigStore};
pub use sync::{discover, Inventory, ModelSync, SyncReport};
