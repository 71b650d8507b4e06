#![allow(dead_code)]

//! Test infrastructure for sv-server API tests

use sv_server::AppState;
use sv_supervisor::{
    HealthProbe, HealthVerdict, LaunchError, LaunchSpec, Launcher, Registry, Supervisor,
    SupervisorTimings, TerminateError, WorkerDefinition,
};

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// Launcher that succeeds unless the port was marked broken.
#[derive(Default)]
pub struct StubLauncher {
    next_pid: AtomicU32,
    launch_delay: Mutex<Duration>,
    broken: Mutex<HashSet<u16>>,
    terminated: Mutex<Vec<u16>>,
}

impl StubLauncher {
    pub fn set_launch_delay(&self, delay: Duration) {
        *self.launch_delay.lock().unwrap() = delay;
    }

    pub fn break_port(&self, port: u16) {
        self.broken.lock().unwrap().insert(port);
    }

    pub fn terminated(&self) -> Vec<u16> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl Launcher for StubLauncher {
    async fn launch(&self, definition: &WorkerDefinition) -> Result<u32, LaunchError> {
        let delay = *self.launch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.broken.lock().unwrap().contains(&definition.port) {
            return Err(LaunchError::rejected("binary not found"));
        }
        Ok(5000 + self.next_pid.fetch_add(1, Ordering::SeqCst))
    }

    async fn terminate(&self, port: u16) -> Result<(), TerminateError> {
        self.terminated.lock().unwrap().push(port);
        Ok(())
    }
}

/// Probe that reports the listed ports healthy.
#[derive(Default)]
pub struct StubProbe {
    healthy: Mutex<HashSet<u16>>,
}

impl StubProbe {
    pub fn set_healthy(&self, port: u16) {
        self.healthy.lock().unwrap().insert(port);
    }
}

#[async_trait]
impl HealthProbe for StubProbe {
    async fn check(&self, definition: &WorkerDefinition) -> HealthVerdict {
        if self.healthy.lock().unwrap().contains(&definition.port) {
            HealthVerdict::Healthy
        } else {
            HealthVerdict::Unhealthy
        }
    }
}

pub struct TestApp {
    pub state: AppState,
    pub launcher: Arc<StubLauncher>,
    pub probe: Arc<StubProbe>,
}

/// The two workers of the default worker table.
pub fn test_registry() -> Registry {
    Registry::new(vec![
        WorkerDefinition::new(
            "RAD RPM Server",
            8001,
            LaunchSpec::new("python3").arg("./servers/rad_rpm.py"),
        )
        .with_tool_id("rad")
        .with_auto_start(true),
        WorkerDefinition::new(
            "DD Aggregator Server",
            8002,
            LaunchSpec::new("python3").arg("./servers/dd_aggregator.py"),
        )
        .with_tool_id("dd"),
    ])
    .unwrap()
}

pub fn create_test_app() -> TestApp {
    let launcher = Arc::new(StubLauncher::default());
    let probe = Arc::new(StubProbe::default());
    let supervisor = Supervisor::new(
        test_registry(),
        launcher.clone(),
        probe.clone(),
        SupervisorTimings::default(),
    );

    TestApp {
        state: AppState::new(Arc::new(supervisor)),
        launcher,
        probe,
    }
}
