//! Run configuration for swapsync.
//!
//! [`SyncDefaults`] holds the fixed constants; [`SyncConfig`] is the explicit,
//! per-invocation configuration built once by the caller and handed to every
//! component by reference.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};

/// Fixed defaults and naming conventions.
pub struct SyncDefaults;

impl SyncDefaults {
    pub const CONFIG_PATH: &'static str = "./config.yaml";
    pub const MODELS_DIR: &'static str = "./models";
    pub const RESTART_TARGET: &'static str = "llama-swap";
    pub const MAX_BACKUPS: usize = 3;

    /// Upper bound on generated model keys, in characters.
    pub const MAX_KEY_LENGTH: usize = 128;
    /// Smallest `max_key_length` the shortening strategy can honour.
    pub const MIN_KEY_LENGTH: usize = 32;
    /// Characters kept from the interior path segments when shortening a key.
    pub const INTERIOR_BUDGET: usize = 32;
    /// Hex characters of the digest appended to hashed keys.
    pub const HASH_SUFFIX_LEN: usize = 8;

    pub const ARTIFACT_EXTENSION: &'static str = "gguf";
    pub const KEY_DELIMITER: &'static str = "--";
    pub const MODELS_SECTION: &'static str = "models";

    pub const BACKUP_INFIX: &'static str = ".bak.";
    pub const LOCK_SUFFIX: &'static str = ".lock";
    pub const TEMP_SUFFIX: &'static str = ".tmp";

    /// Placeholder substituted with the artifact's relative path.
    pub const MODEL_PATH_PLACEHOLDER: &'static str = "{model_path}";

    pub const CMD_TEMPLATE: &'static str = "/app/llama-server
  -m /models/{model_path}
  -ngl 99
  -c 4096
  -b 2048
  -ub 512
  --temp 0.7
  --top-p 0.95
  --top-k 40
  --repeat-penalty 1.1
  --port ${PORT}
  --host 0.0.0.0";
}

/// Configuration for one reconciliation run.
///
/// # Example
///
/// ```
/// use swapsync_core::SyncConfig;
///
/// let config = SyncConfig::new("/srv/llama-swap/config.yaml", "/srv/models")
///     .with_prune(true)
///     .with_max_backups(5)
///     .with_restart_target(None::<String>);
/// assert!(config.validate().is_ok());
/// assert!(config.lock_path().ends_with("config.yaml.lock"));
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// YAML config file to reconcile
    pub config_path: PathBuf,
    /// Root of the model tree to scan
    pub models_dir: PathBuf,
    /// Service restarted after a successful save
    pub restart_target: Option<String>,
    /// Remove entries whose artifact is gone
    pub prune: bool,
    /// Log intended changes without touching disk or services
    pub dry_run: bool,
    /// Notify the restart target after a save
    pub restart: bool,
    /// Backup snapshots kept after rotation; 0 disables backups
    pub max_backups: usize,
    /// Upper bound on generated keys, in characters
    pub max_key_length: usize,
    /// Command template for new entries
    pub cmd_template: String,
    /// Report only the first file of a split GGUF set
    pub collapse_shards: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(SyncDefaults::CONFIG_PATH, SyncDefaults::MODELS_DIR)
    }
}

impl SyncConfig {
    /// Create a configuration with default settings for the given paths.
    pub fn new(config_path: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            models_dir: models_dir.into(),
            restart_target: Some(SyncDefaults::RESTART_TARGET.to_string()),
            prune: false,
            dry_run: false,
            restart: true,
            max_backups: SyncDefaults::MAX_BACKUPS,
            max_key_length: SyncDefaults::MAX_KEY_LENGTH,
            cmd_template: SyncDefaults::CMD_TEMPLATE.to_string(),
            collapse_shards: true,
        }
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable the post-save restart.
    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    /// Set the service to restart. An empty or `None` target skips the restart.
    pub fn with_restart_target<S: Into<String>>(mut self, target: Option<S>) -> Self {
        self.restart_target = target.map(Into::into).filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    pub fn with_cmd_template(mut self, template: impl Into<String>) -> Self {
        self.cmd_template = template.into();
        self
    }

    pub fn with_collapse_shards(mut self, collapse: bool) -> Self {
        self.collapse_shards = collapse;
        self
    }

    /// Check the settings that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.max_key_length < SyncDefaults::MIN_KEY_LENGTH {
            return Err(SyncError::Validation {
                field: "max_key_length".to_string(),
                message: format!(
                    "must be at least {}, got {}",
                    SyncDefaults::MIN_KEY_LENGTH,
                    self.max_key_length
                ),
            });
        }

        if !self
            .cmd_template
            .contains(SyncDefaults::MODEL_PATH_PLACEHOLDER)
        {
            return Err(SyncError::Validation {
                field: "cmd_template".to_string(),
                message: format!(
                    "must contain the {} placeholder",
                    SyncDefaults::MODEL_PATH_PLACEHOLDER
                ),
            });
        }

        if self.config_path.as_os_str().is_empty() {
            return Err(SyncError::Validation {
                field: "config_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// `<config>.lock`
    pub fn lock_path(&self) -> PathBuf {
        sibling_path(&self.config_path, SyncDefaults::LOCK_SUFFIX)
    }

    /// `<config>.tmp`
    pub fn temp_path(&self) -> PathBuf {
        sibling_path(&self.config_path, SyncDefaults::TEMP_SUFFIX)
    }
}

/// Append `suffix` to the final component of `path`.
///
/// Unlike [`Path::with_extension`] this never replaces an existing extension,
/// so `config.yaml` becomes `config.yaml.lock`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
