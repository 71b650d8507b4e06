//! Local worker supervision: starts, stops and health-checks a fixed set of
//! worker processes, keeping one authoritative state per worker port.

mod error;
mod health;
mod http_health_probe;
mod launch_error;
mod launch_spec;
mod launcher;
mod process_launcher;
mod registry;
mod server_state;
mod server_status;
mod shutdown_coordinator;
mod shutdown_guard;
mod state_store;
mod supervisor;
mod supervisor_timings;
mod sweep_summary;
mod terminate_error;
mod worker_definition;

#[cfg(test)]
mod tests;

pub use error::{Result as SupervisorResult, SupervisorError};
pub use health::{HealthProbe, HealthVerdict};
pub use http_health_probe::HttpHealthProbe;
pub use launch_error::LaunchError;
pub use launch_spec::LaunchSpec;
pub use launcher::Launcher;
pub use process_launcher::ProcessLauncher;
pub use registry::Registry;
pub use server_state::ServerState;
pub use server_status::ServerStatus;
pub use shutdown_coordinator::ShutdownCoordinator;
pub use shutdown_guard::ShutdownGuard;
pub use state_store::StateStore;
pub use supervisor::Supervisor;
pub use supervisor_timings::SupervisorTimings;
pub use sweep_summary::SweepSummary;
pub use terminate_error::TerminateError;
pub use worker_definition::WorkerDefinition;

/// Error message recorded when a health probe fails.
pub const HEALTH_CHECK_FAILED: &str = "health check failed";

/// Error message recorded when a start was abandoned before the launch settled.
pub const LAUNCH_INTERRUPTED: &str = "launch interrupted before completion";

/// Placeholder in launch arguments replaced with the worker port.
pub const PORT_PLACEHOLDER: &str = "{port}";
