pub mod api;
pub mod app_state;
pub mod error;
pub mod health;
pub mod logger;
pub mod routes;
pub mod serve;

#[cfg(test)]
mod tests;

pub use api::{
    error::ApiError,
    error::Result as ApiResult,
    resolve::parse_port,
    workers::{
        worker_dto::WorkerDto,
        worker_list_response::WorkerListResponse,
        worker_response::WorkerResponse,
        workers::{
            check_worker, get_tool_worker, get_worker, list_workers, start_worker, stop_worker,
        },
    },
};
pub use app_state::AppState;

pub use crate::routes::build_router;
pub use crate::serve::run;
