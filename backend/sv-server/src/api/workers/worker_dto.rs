use serde::Serialize;
use sv_supervisor::{ServerState, WorkerDefinition};

/// A worker as the UI sees it: its definition plus its current state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDto {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    pub auto_start: bool,
    pub health_path: String,
    pub command: String,
    #[serde(flatten)]
    pub state: ServerState,
}

impl WorkerDto {
    pub fn new(definition: &WorkerDefinition, state: ServerState) -> Self {
        Self {
            name: definition.name.clone(),
            tool_id: definition.tool_id.clone(),
            auto_start: definition.auto_start,
            health_path: definition.health_path.clone(),
            command: definition.launch.display_command(definition.port),
            state,
        }
    }
}
