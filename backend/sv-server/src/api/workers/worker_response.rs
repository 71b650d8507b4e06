use crate::WorkerDto;
use serde::Serialize;

/// Single worker response
#[derive(Debug, Serialize)]
pub struct WorkerResponse {
    pub worker: WorkerDto,
}
