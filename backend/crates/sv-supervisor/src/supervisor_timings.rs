use std::time::Duration;

use sv_config::SupervisorConfig;

/// Bounds on every external operation the supervisor performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimings {
    pub sweep_interval: Duration,
    pub probe_timeout: Duration,
    pub launch_timeout: Duration,
    pub terminate_timeout: Duration,
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            launch_timeout: Duration::from_secs(10),
            terminate_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SupervisorConfig> for SupervisorTimings {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            sweep_interval: config.sweep_interval(),
            probe_timeout: config.probe_timeout(),
            launch_timeout: config.launch_timeout(),
            terminate_timeout: config.terminate_timeout(),
        }
    }
}
