use crate::{ConfigError, ConfigErrorResult, DEFAULT_HOST};

use std::time::Duration;

use serde::Deserialize;

pub const MIN_SWEEP_INTERVAL_SECS: u64 = 1;
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TERMINATE_TIMEOUT_SECS: u64 = 5;

/// Timing and probing settings for the worker supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Host the health probe connects to
    pub host: String,
    /// Seconds between health sweeps over running workers
    pub sweep_interval_secs: u64,
    /// Upper bound for a single health probe
    pub probe_timeout_secs: u64,
    /// Upper bound for a single launch
    pub launch_timeout_secs: u64,
    /// Grace period between SIGTERM and a forced kill
    pub terminate_timeout_secs: u64,
    /// Directory for worker stdout/stderr, relative to the config directory
    pub worker_log_dir: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT_SECS,
            terminate_timeout_secs: DEFAULT_TERMINATE_TIMEOUT_SECS,
            worker_log_dir: None,
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.sweep_interval_secs < MIN_SWEEP_INTERVAL_SECS
            || self.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS
        {
            return Err(ConfigError::supervisor(format!(
                "supervisor.sweep_interval_secs must be {}-{}, got {}",
                MIN_SWEEP_INTERVAL_SECS, MAX_SWEEP_INTERVAL_SECS, self.sweep_interval_secs
            )));
        }

        Self::validate_timeout("probe_timeout_secs", self.probe_timeout_secs)?;
        Self::validate_timeout("launch_timeout_secs", self.launch_timeout_secs)?;
        Self::validate_timeout("terminate_timeout_secs", self.terminate_timeout_secs)?;

        if self.host.trim().is_empty() {
            return Err(ConfigError::supervisor("supervisor.host cannot be empty"));
        }

        if let Some(ref dir) = self.worker_log_dir
            && (std::path::Path::new(dir).is_absolute() || dir.contains(".."))
        {
            return Err(ConfigError::supervisor(
                "supervisor.worker_log_dir must be relative and cannot contain '..'",
            ));
        }

        Ok(())
    }

    #[track_caller]
    fn validate_timeout(field: &str, value: u64) -> ConfigErrorResult<()> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&value) {
            return Err(ConfigError::supervisor(format!(
                "supervisor.{field} must be {MIN_TIMEOUT_SECS}-{MAX_TIMEOUT_SECS}, got {value}"
            )));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_secs(self.terminate_timeout_secs)
    }
}
