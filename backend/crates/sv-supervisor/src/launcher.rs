use crate::{LaunchError, TerminateError, WorkerDefinition};

use async_trait::async_trait;

/// Starts and stops worker processes.
///
/// The supervisor serializes calls per port, so implementations never see
/// two concurrent calls for the same worker.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the worker and return its pid.
    async fn launch(&self, definition: &WorkerDefinition) -> Result<u32, LaunchError>;

    /// Stop the worker on `port`. Stopping a worker that is not running is
    /// not an error.
    async fn terminate(&self, port: u16) -> Result<(), TerminateError>;
}
