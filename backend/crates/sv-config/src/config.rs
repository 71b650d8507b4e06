use crate::{
    ApiConfig, CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILENAME, ConfigError, ConfigErrorResult,
    LoggingConfig, SupervisorConfig, WorkerConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub supervisor: SupervisorConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub workers: Vec<WorkerConfig>,
}

impl Config {
    /// Load config from the config directory.
    ///
    /// Loading order:
    /// 1. SV_CONFIG_DIR env var, else ./.sv/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply SV_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;
        Self::load_from(&config_dir)
    }

    /// Same as `load()` with an explicit directory.
    pub fn load_from(config_dir: &Path) -> ConfigErrorResult<Self> {
        if !config_dir.exists() {
            std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.to_path_buf(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse a config from TOML text. No env overrides are applied.
    pub fn from_toml_str(contents: &str) -> ConfigErrorResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Toml {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: SV_CONFIG_DIR env var > ./.sv/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(CONFIG_DIR_NAME))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.supervisor.validate()?;
        self.api.validate()?;

        for worker in &self.workers {
            worker.validate()?;
        }

        if let Some(ref file) = self.logging.file
            && (Path::new(file).is_absolute() || file.contains(".."))
        {
            return Err(ConfigError::config(
                "logging.file must be relative and cannot contain '..'",
            ));
        }

        Ok(())
    }

    /// Absolute worker log directory, if worker output capture is enabled.
    pub fn worker_log_dir(&self, config_dir: &Path) -> Option<PathBuf> {
        self.supervisor
            .worker_log_dir
            .as_ref()
            .map(|dir| config_dir.join(dir))
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  supervisor: probe host {}, sweep every {}s",
            self.supervisor.host, self.supervisor.sweep_interval_secs
        );
        info!(
            "  timeouts: probe={}s, launch={}s, terminate={}s",
            self.supervisor.probe_timeout_secs,
            self.supervisor.launch_timeout_secs,
            self.supervisor.terminate_timeout_secs
        );
        info!("  api: {}", self.api.bind_addr());
        info!(
            "  logging: {} (colored: {})",
            *self.logging.level, self.logging.colored
        );
        info!("  workers: {}", self.workers.len());

        for worker in &self.workers {
            info!(
                "    {} on port {} (auto_start: {}, health: {})",
                worker.name, worker.port, worker.auto_start, worker.health_path
            );
        }
    }

    fn apply_env_overrides(&mut self) {
        // Supervisor
        Self::apply_env_string("SV_SUPERVISOR_HOST", &mut self.supervisor.host);
        Self::apply_env_parse(
            "SV_SWEEP_INTERVAL_SECS",
            &mut self.supervisor.sweep_interval_secs,
        );
        Self::apply_env_parse(
            "SV_PROBE_TIMEOUT_SECS",
            &mut self.supervisor.probe_timeout_secs,
        );
        Self::apply_env_parse(
            "SV_LAUNCH_TIMEOUT_SECS",
            &mut self.supervisor.launch_timeout_secs,
        );
        Self::apply_env_parse(
            "SV_TERMINATE_TIMEOUT_SECS",
            &mut self.supervisor.terminate_timeout_secs,
        );

        // Api
        Self::apply_env_string("SV_API_HOST", &mut self.api.host);
        Self::apply_env_parse("SV_API_PORT", &mut self.api.port);

        // Logging
        Self::apply_env_parse("SV_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("SV_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("SV_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
