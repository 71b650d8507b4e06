//! The daemon's lifetime around the control API.

use crate::error::{Result, ServerError};
use crate::{AppState, build_router};

use std::sync::Arc;

use log::{info, warn};
use sv_supervisor::Supervisor;
use tokio::net::TcpListener;

/// Reconcile and auto-start the workers, then sweep and serve the control API
/// on `listener` until shutdown is triggered.
///
/// Every worker is stopped before this returns, including when shutdown is
/// triggered during initialization or serving fails.
pub async fn run(supervisor: Arc<Supervisor>, listener: TcpListener) -> Result<()> {
    let outcome = serve_until_shutdown(&supervisor, listener).await;
    supervisor.shutdown().await;
    outcome
}

async fn serve_until_shutdown(supervisor: &Arc<Supervisor>, listener: TcpListener) -> Result<()> {
    let states = supervisor.initialize().await?;
    for state in states.values() {
        info!("Worker on port {}: {}", state.port(), state.status());
    }

    if supervisor.is_shutting_down() {
        info!("Shutdown requested during initialization");
        return Ok(());
    }

    let sweep = supervisor.spawn_sweep();
    let app = build_router(AppState::new(Arc::clone(supervisor)));
    let mut guard = supervisor.shutdown_coordinator().subscribe_guard();

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            guard.wait().await;
            info!("Control API closed");
        })
        .await
        .map_err(|source| ServerError::Serve { source });

    // Serving can end with an error before any signal arrives.
    supervisor.shutdown_coordinator().shutdown();
    if let Err(e) = sweep.await {
        warn!("Health sweep task ended abnormally: {e}");
    }

    served
}
