//! Worker REST API handlers
//!
//! Mutating handlers run the supervisor call on its own task, so a client
//! that disconnects mid-request cannot abandon a start or stop halfway.

use crate::{ApiError, ApiResult, AppState, WorkerDto, WorkerListResponse, WorkerResponse, parse_port};

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use sv_supervisor::{ServerState, Supervisor, SupervisorResult};

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/v1/workers
pub async fn list_workers(State(state): State<AppState>) -> ApiResult<Json<WorkerListResponse>> {
    let states = state.supervisor.get_all_states();

    let workers = state
        .supervisor
        .registry()
        .all()
        .filter_map(|definition| {
            states
                .get(&definition.port)
                .map(|s| WorkerDto::new(definition, s.clone()))
        })
        .collect();

    Ok(Json(WorkerListResponse { workers }))
}

/// GET /api/v1/workers/{port}
pub async fn get_worker(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> ApiResult<Json<WorkerResponse>> {
    let port = parse_port(&port)?;
    let current = state
        .supervisor
        .get_state(port)
        .ok_or_else(|| ApiError::not_found(format!("No worker on port {port}")))?;

    respond(&state, current)
}

/// POST /api/v1/workers/{port}/start
pub async fn start_worker(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> ApiResult<Json<WorkerResponse>> {
    let port = parse_port(&port)?;
    let updated = run_detached(&state, move |s| async move { s.start(port).await }).await?;

    respond(&state, updated)
}

/// POST /api/v1/workers/{port}/stop
pub async fn stop_worker(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> ApiResult<Json<WorkerResponse>> {
    let port = parse_port(&port)?;
    let updated = run_detached(&state, move |s| async move { s.stop(port).await }).await?;

    respond(&state, updated)
}

/// POST /api/v1/workers/{port}/check
pub async fn check_worker(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> ApiResult<Json<WorkerResponse>> {
    let port = parse_port(&port)?;
    let updated = run_detached(&state, move |s| async move { s.check_health(port).await }).await?;

    respond(&state, updated)
}

/// GET /api/v1/tools/{tool_id}/worker
///
/// The worker backing a tool tab, if any.
pub async fn get_tool_worker(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
) -> ApiResult<Json<WorkerResponse>> {
    let port = state
        .supervisor
        .registry()
        .by_tool(&tool_id)
        .map(|definition| definition.port)
        .ok_or_else(|| ApiError::not_found(format!("No worker backs tool '{tool_id}'")))?;

    let current = state
        .supervisor
        .get_state(port)
        .ok_or_else(|| ApiError::not_found(format!("No worker on port {port}")))?;

    respond(&state, current)
}

// =============================================================================
// Helpers
// =============================================================================

async fn run_detached<F, Fut>(state: &AppState, op: F) -> ApiResult<ServerState>
where
    F: FnOnce(Arc<Supervisor>) -> Fut,
    Fut: Future<Output = SupervisorResult<ServerState>> + Send + 'static,
{
    let task = tokio::spawn(op(Arc::clone(&state.supervisor)));
    Ok(task.await??)
}

fn respond(state: &AppState, current: ServerState) -> ApiResult<Json<WorkerResponse>> {
    let definition = state
        .supervisor
        .registry()
        .by_port(current.port())
        .ok_or_else(|| ApiError::not_found(format!("No worker on port {}", current.port())))?;

    Ok(Json(WorkerResponse {
        worker: WorkerDto::new(definition, current),
    }))
}
