use crate::{HealthProbe, HealthVerdict, SupervisorResult, WorkerDefinition};

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

/// Probes `GET http://{host}:{port}{health_path}`. Any 2xx is healthy.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    host: String,
}

impl HttpHealthProbe {
    pub fn new<S: Into<String>>(host: S, timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            host: host.into(),
        })
    }

    pub fn url_for(&self, definition: &WorkerDefinition) -> String {
        format!(
            "http://{}:{}{}",
            self.host, definition.port, definition.health_path
        )
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self, definition: &WorkerDefinition) -> HealthVerdict {
        let url = self.url_for(definition);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => HealthVerdict::Healthy,
            Ok(resp) => {
                debug!("Health check {url} returned HTTP {}", resp.status());
                HealthVerdict::Unhealthy
            }
            Err(e) => {
                debug!("Health check {url} failed: {e}");
                HealthVerdict::Unhealthy
            }
        }
    }
}
