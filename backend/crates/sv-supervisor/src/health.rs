use crate::WorkerDefinition;

use async_trait::async_trait;

/// Outcome of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    Unhealthy,
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Liveness check for a worker. Implementations fold every failure into
/// `Unhealthy`; the supervisor bounds each call with its own timeout.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, definition: &WorkerDefinition) -> HealthVerdict;
}
