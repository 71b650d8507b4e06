use std::sync::Arc;

use sv_supervisor::Supervisor;

/// Shared state for every control API handler.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }
}
