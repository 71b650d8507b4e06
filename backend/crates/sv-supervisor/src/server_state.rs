use crate::ServerStatus;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable state of one worker.
///
/// Only the supervisor mutates it; everyone else reads clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    port: u16,
    status: ServerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_health_check: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl ServerState {
    pub fn stopped(port: u16) -> Self {
        Self {
            port,
            status: ServerStatus::Stopped,
            pid: None,
            last_health_check: None,
            error_message: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn last_health_check(&self) -> Option<DateTime<Utc>> {
        self.last_health_check
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.status == ServerStatus::Running
    }

    // Transitions below keep errorMessage present iff status is Error.

    pub(crate) fn to_starting(&self) -> Self {
        Self {
            status: ServerStatus::Starting,
            pid: None,
            error_message: None,
            ..self.clone()
        }
    }

    /// A `None` check time keeps the previous one.
    pub(crate) fn to_running(&self, pid: Option<u32>, checked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            status: ServerStatus::Running,
            pid,
            last_health_check: checked_at.or(self.last_health_check),
            error_message: None,
            ..self.clone()
        }
    }

    pub(crate) fn to_error<S: Into<String>>(&self, message: S) -> Self {
        Self {
            status: ServerStatus::Error,
            error_message: Some(message.into()),
            ..self.clone()
        }
    }

    pub(crate) fn to_stopped(&self) -> Self {
        Self {
            status: ServerStatus::Stopped,
            pid: None,
            error_message: None,
            ..self.clone()
        }
    }

    pub(crate) fn with_health_check(&self, at: DateTime<Utc>) -> Self {
        Self {
            last_health_check: Some(at),
            ..self.clone()
        }
    }
}
