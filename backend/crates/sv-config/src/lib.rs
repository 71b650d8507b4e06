mod api_config;
mod config;
mod error;
mod log_level;
mod logging_config;
mod supervisor_config;
mod worker_config;

#[cfg(test)]
mod tests;

pub use api_config::ApiConfig;
pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use supervisor_config::SupervisorConfig;
pub use worker_config::WorkerConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 7900;
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
const DEFAULT_LOG_COLORED: bool = true;
const DEFAULT_HEALTH_PATH: &str = "/health";

const CONFIG_DIR_ENV: &str = "SV_CONFIG_DIR";
const CONFIG_DIR_NAME: &str = ".sv";
const CONFIG_FILENAME: &str = "config.toml";

const MIN_WORKER_PORT: u16 = 1024;
