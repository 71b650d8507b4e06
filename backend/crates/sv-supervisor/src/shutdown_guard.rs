use crate::ShutdownCoordinator;

use tokio::sync::watch;

/// Per-task handle for waiting on shutdown.
#[derive(Debug)]
pub struct ShutdownGuard {
    shutdown_rx: watch::Receiver<bool>,
}

impl ShutdownGuard {
    pub fn new(coordinator: &ShutdownCoordinator) -> Self {
        Self {
            shutdown_rx: coordinator.subscribe(),
        }
    }

    /// Resolves once shutdown has been triggered, including before this call.
    pub async fn wait(&mut self) {
        let _ = self.shutdown_rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}
