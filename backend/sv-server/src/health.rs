use crate::AppState;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sv_supervisor::ServerStatus;

/// GET /health - Daemon liveness plus a worker tally
pub async fn health(State(state): State<AppState>) -> Response {
    let states = state.supervisor.get_all_states();
    let count = |status: ServerStatus| states.values().filter(|s| s.status() == status).count();

    let health = json!({
        "status": if state.supervisor.is_shutting_down() { "shutting_down" } else { "healthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "workers": {
            "total": states.len(),
            "running": count(ServerStatus::Running),
            "starting": count(ServerStatus::Starting),
            "stopped": count(ServerStatus::Stopped),
            "error": count(ServerStatus::Error),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health)).into_response()
}
