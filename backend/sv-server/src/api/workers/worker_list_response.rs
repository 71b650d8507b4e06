use crate::WorkerDto;
use serde::Serialize;

/// All workers, in port order
#[derive(Debug, Serialize)]
pub struct WorkerListResponse {
    pub workers: Vec<WorkerDto>,
}
