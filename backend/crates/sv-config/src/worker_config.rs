use crate::{ConfigError, ConfigErrorResult, DEFAULT_HEALTH_PATH, MIN_WORKER_PORT};

use std::collections::BTreeMap;

use serde::Deserialize;

/// One `[[workers]]` entry: a local process backing a UI tool.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    /// UI tool this worker backs (e.g. "rpm")
    #[serde(default)]
    pub tool_id: Option<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub port: u16,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

fn default_health_path() -> String {
    String::from(DEFAULT_HEALTH_PATH)
}

impl WorkerConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::worker(format!(
                "workers[port={}].name cannot be empty",
                self.port
            )));
        }

        if self.program.trim().is_empty() {
            return Err(ConfigError::worker(format!(
                "workers[{}].program cannot be empty",
                self.name
            )));
        }

        if self.port < MIN_WORKER_PORT {
            return Err(ConfigError::worker(format!(
                "workers[{}].port must be >= {}, got {}",
                self.name, MIN_WORKER_PORT, self.port
            )));
        }

        if !self.health_path.starts_with('/') {
            return Err(ConfigError::worker(format!(
                "workers[{}].health_path must start with '/', got {:?}",
                self.name, self.health_path
            )));
        }

        Ok(())
    }
}
