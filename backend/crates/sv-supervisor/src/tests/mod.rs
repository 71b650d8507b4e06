mod shutdown;
mod supervisor;

pub(crate) use fakes::{FakeLauncher, FakeProbe};

use crate::{LaunchSpec, Registry, Supervisor, SupervisorTimings, WorkerDefinition};

use std::sync::Arc;

pub(crate) fn definition(name: &str, port: u16) -> WorkerDefinition {
    let launch = LaunchSpec::new("python3")
        .arg(format!("./servers/{name}.py"))
        .arg("--port")
        .arg("{port}");
    WorkerDefinition::new(name, port, launch)
}

pub(crate) fn supervisor_with(
    definitions: Vec<WorkerDefinition>,
    launcher: &Arc<FakeLauncher>,
    probe: &Arc<FakeProbe>,
) -> Arc<Supervisor> {
    let registry = Registry::new(definitions).unwrap();
    Arc::new(Supervisor::new(
        registry,
        launcher.clone(),
        probe.clone(),
        SupervisorTimings::default(),
    ))
}

/// Two workers, `rpm` on 8001 and `aggregator` on 8002.
pub(crate) fn two_workers() -> (Arc<Supervisor>, Arc<FakeLauncher>, Arc<FakeProbe>) {
    let launcher = Arc::new(FakeLauncher::new());
    let probe = Arc::new(FakeProbe::new());
    let supervisor = supervisor_with(
        vec![definition("rpm", 8001), definition("aggregator", 8002)],
        &launcher,
        &probe,
    );
    (supervisor, launcher, probe)
}
