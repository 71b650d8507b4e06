use crate::LaunchSpec;

use std::path::PathBuf;

use serde::Serialize;
use sv_config::WorkerConfig;

const DEFAULT_HEALTH_PATH: &str = "/health";

/// Immutable description of one worker. Identity is the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    pub launch: LaunchSpec,
    pub port: u16,
    pub auto_start: bool,
    pub health_path: String,
}

impl WorkerDefinition {
    pub fn new<S: Into<String>>(name: S, port: u16, launch: LaunchSpec) -> Self {
        Self {
            name: name.into(),
            tool_id: None,
            launch,
            port,
            auto_start: false,
            health_path: String::from(DEFAULT_HEALTH_PATH),
        }
    }

    pub fn with_tool_id<S: Into<String>>(mut self, tool_id: S) -> Self {
        self.tool_id = Some(tool_id.into());
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_health_path<S: Into<String>>(mut self, health_path: S) -> Self {
        self.health_path = health_path.into();
        self
    }
}

impl From<&WorkerConfig> for WorkerDefinition {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            name: config.name.clone(),
            tool_id: config.tool_id.clone(),
            launch: LaunchSpec {
                program: config.program.clone(),
                args: config.args.clone(),
                working_dir: config.working_dir.as_ref().map(PathBuf::from),
                env: config.env.clone(),
            },
            port: config.port,
            auto_start: config.auto_start,
            health_path: config.health_path.clone(),
        }
    }
}
