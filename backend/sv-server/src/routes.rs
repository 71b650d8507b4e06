use crate::{
    AppState, check_worker, get_tool_worker, get_worker, health, list_workers, start_worker,
    stop_worker,
};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

/// Build the control API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Workers
        .route("/api/v1/workers", get(list_workers))
        .route("/api/v1/workers/{port}", get(get_worker))
        .route("/api/v1/workers/{port}/start", post(start_worker))
        .route("/api/v1/workers/{port}/stop", post(stop_worker))
        .route("/api/v1/workers/{port}/check", post(check_worker))
        // Tool lookup
        .route("/api/v1/tools/{tool_id}/worker", get(get_tool_worker))
        .with_state(state)
        // The UI is served from another local origin
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
