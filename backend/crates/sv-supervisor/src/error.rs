use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Port {port} is declared by both {first:?} and {second:?} {location}")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
        location: ErrorLocation,
    },

    #[error("Tool {tool_id:?} is backed by more than one worker {location}")]
    DuplicateTool {
        tool_id: String,
        location: ErrorLocation,
    },

    #[error("No worker registered on port {port} {location}")]
    UnknownPort { port: u16, location: ErrorLocation },

    #[error("Supervisor already initialized {location}")]
    AlreadyInitialized { location: ErrorLocation },

    #[error("Supervisor is shutting down {location}")]
    ShuttingDown { location: ErrorLocation },

    #[error("Failed to build health probe client: {source} {location}")]
    ProbeClient {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    /// Registry problems are fatal: the supervisor must not start with them.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePort { .. } | Self::DuplicateTool { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::DuplicatePort { .. } => {
                "Two workers share a port. \
                   Give every [[workers]] entry in config.toml its own port."
            }
            Self::DuplicateTool { .. } => {
                "A tool is mapped to several workers. \
                   Each tool_id may appear on one [[workers]] entry only."
            }
            Self::UnknownPort { .. } => {
                "The requested port is not in the worker registry. \
                   List workers to see the configured ports."
            }
            Self::AlreadyInitialized { .. } => {
                "Initialization runs once per process. Restart the supervisor to re-initialize."
            }
            Self::ShuttingDown { .. } => {
                "The supervisor is stopping and no longer accepts start requests."
            }
            Self::ProbeClient { .. } => {
                "The HTTP client for health checks could not be created. \
                   Check the logs for TLS or resolver errors."
            }
        }
    }

    #[track_caller]
    pub(crate) fn unknown_port(port: u16) -> Self {
        Self::UnknownPort {
            port,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::ProbeClient {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
