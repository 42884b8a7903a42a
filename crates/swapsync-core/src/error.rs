//! Error types for swapsync.
//!
//! Every failure the engine can hit is one variant of [`SyncError`]. The
//! variants fall into the classes reported by [`SyncError::kind`], which the
//! binary uses to pick an exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    // Input errors
    #[error("Invalid artifact path: {0}")]
    InvalidArtifactPath(String),

    // State errors
    #[error("Lock file {lock_path:?} already exists (held by {})", .holder.as_deref().unwrap_or("unknown process"))]
    AlreadyLocked {
        lock_path: PathBuf,
        /// Contents of the lock file, normally the owning PID
        holder: Option<String>,
    },

    #[error("Failed to parse config file {path:?}: {message}")]
    ConfigParse {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    #[error("Model key collision: '{first}' and '{second}' both map to key '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },

    // Environment errors
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Persistence errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Restart notifier errors
    #[error("Failed to restart {service}: {message}")]
    Notifier { service: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for swapsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Broad failure class of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A single artifact path was unusable; skipped, never fatal.
    Input,
    /// Lock contention, corrupt config, or key collision; aborts before any write.
    State,
    /// Scan directory missing or unreadable; degrades to "no artifacts".
    Environment,
    /// Writing the config failed; the previous file is left in place.
    Persistence,
    /// Anything else.
    Internal,
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SyncError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::InvalidArtifactPath(_) => ErrorKind::Input,

            SyncError::AlreadyLocked { .. }
            | SyncError::ConfigParse { .. }
            | SyncError::KeyCollision { .. } => ErrorKind::State,

            SyncError::DirectoryNotFound(_)
            | SyncError::PermissionDenied(_)
            | SyncError::NotADirectory(_) => ErrorKind::Environment,

            SyncError::Io { .. } | SyncError::Yaml { .. } => ErrorKind::Persistence,

            SyncError::Json { .. }
            | SyncError::Validation { .. }
            | SyncError::Notifier { .. }
            | SyncError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Process exit status for a run that ended with this error.
    ///
    /// - 1: persistence or internal failure
    /// - 2: corrupt config or key collision
    /// - 3: another run holds the lock
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::AlreadyLocked { .. } => 3,
            SyncError::ConfigParse { .. } | SyncError::KeyCollision { .. } => 2,
            _ => 1,
        }
    }

    /// Whether the run can carry on as if the scan found nothing.
    pub fn is_environmental(&self) -> bool {
        self.kind() == ErrorKind::Environment
    }
}
