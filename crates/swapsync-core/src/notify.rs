//! Restarting the model-serving service after a config change.
//!
//! The engine only needs "restart service X" from its environment, so the
//! container runtime sits behind [`RestartNotifier`]. The stock implementation
//! shells out to the docker CLI.

use crate::error::{Result, SyncError};
use serde::Serialize;
use std::ffi::OsString;
use std::process::Command;
use tracing::{debug, info};

/// Something that can restart a named service.
pub trait RestartNotifier {
    /// Restart `service`, returning once the request has been accepted.
    fn restart(&self, service: &str) -> Result<()>;
}

/// Restarts a container with `docker restart <service>`.
#[derive(Debug, Clone)]
pub struct DockerCliNotifier {
    program: OsString,
}

impl Default for DockerCliNotifier {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCliNotifier {
    /// Use a specific executable instead of `docker` from `PATH`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RestartNotifier for DockerCliNotifier {
    fn restart(&self, service: &str) -> Result<()> {
        debug!("Running {:?} restart {}", self.program, service);

        let output = Command::new(&self.program)
            .arg("restart")
            .arg(service)
            .output()
            .map_err(|e| SyncError::Notifier {
                service: service.to_string(),
                message: format!("could not run {:?}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(SyncError::Notifier {
                service: service.to_string(),
                message,
            });
        }

        info!("Successfully restarted container '{}'", service);
        Ok(())
    }
}

/// Accepts every restart without doing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl RestartNotifier for NoopNotifier {
    fn restart(&self, service: &str) -> Result<()> {
        debug!("Restart of '{}' ignored", service);
        Ok(())
    }
}

/// What happened to the restart step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestartOutcome {
    /// Nothing was saved.
    #[default]
    NotNeeded,
    /// Saved, but restarts are turned off or no target is set.
    Skipped { reason: String },
    /// Would have restarted.
    DryRun,
    Restarted,
    /// The notifier failed; the saved config stays in place.
    Failed { message: String },
}
