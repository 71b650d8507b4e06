use std::time::Duration;

use thiserror::Error;

/// Why a worker process could not be stopped cleanly.
#[derive(Error, Debug)]
pub enum TerminateError {
    /// Refused by a [`crate::Launcher`] before any OS call. `ProcessLauncher`
    /// never returns this; other launchers use it to report a terminate they
    /// decline, and the message is shown as is.
    #[error("{message}")]
    Rejected { message: String },

    #[error("failed to signal pid {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("failed to reap pid {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("terminate timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl TerminateError {
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
