use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a worker process could not be started.
///
/// The Display text becomes the worker's `errorMessage`, so it carries no
/// source location.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Refused by a [`crate::Launcher`] before any OS call. `ProcessLauncher`
    /// never returns this; other launchers use it to report a launch they
    /// decline, and the message is shown as is.
    #[error("{message}")]
    Rejected { message: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open worker log {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited during startup ({status})")]
    ExitedEarly { program: String, status: String },

    #[error("launch timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl LaunchError {
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
