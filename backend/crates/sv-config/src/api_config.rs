use crate::{ConfigError, ConfigErrorResult, DEFAULT_API_PORT, DEFAULT_HOST};

use serde::Deserialize;

/// Bind address of the local control API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_API_PORT,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        // Loopback only
        if self.host != DEFAULT_HOST && self.host != "localhost" {
            return Err(ConfigError::api(format!(
                "api.host must be {DEFAULT_HOST} or localhost, got {}",
                self.host
            )));
        }

        if self.port == 0 {
            return Err(ConfigError::api("api.port must be non-zero"));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
