//! The worker state machine.
//!
//! Every mutation of a worker runs under that worker's lock, so start, stop,
//! manual checks and sweep results for one port are applied one at a time,
//! while different ports proceed independently. Reads go straight to the
//! [`StateStore`] and never wait on a lock.

use crate::{
    HEALTH_CHECK_FAILED, HealthProbe, HealthVerdict, LAUNCH_INTERRUPTED, LaunchError, Launcher,
    Registry, ServerState, ServerStatus, ShutdownCoordinator, StateStore, SupervisorError,
    SupervisorResult, SupervisorTimings, SweepSummary, TerminateError, WorkerDefinition,
};

use std::collections::{BTreeMap, HashMap};
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use error_location::ErrorLocation;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Extra time allowed on top of the terminate timeout for a forced kill.
const TERMINATE_MARGIN: Duration = Duration::from_secs(2);

pub struct Supervisor {
    registry: Registry,
    store: StateStore,
    locks: HashMap<u16, Mutex<()>>,
    start_pending: HashMap<u16, AtomicBool>,
    launcher: Arc<dyn Launcher>,
    probe: Arc<dyn HealthProbe>,
    timings: SupervisorTimings,
    initialized: AtomicBool,
    shutdown: ShutdownCoordinator,
}

enum SweepOutcome {
    Healthy,
    Failed,
    Skipped,
}

/// Marks a worker `Error` if a start is dropped while its launch is pending.
struct PendingLaunch<'a> {
    store: &'a StateStore,
    port: u16,
    armed: bool,
}

impl<'a> PendingLaunch<'a> {
    fn new(store: &'a StateStore, port: u16) -> Self {
        Self {
            store,
            port,
            armed: true,
        }
    }

    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingLaunch<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(current) = self.store.get(self.port)
            && current.status() == ServerStatus::Starting
        {
            warn!("Start of worker on port {} was abandoned", self.port);
            self.store.replace(current.to_error(LAUNCH_INTERRUPTED));
        }
    }
}

/// Claims a port's start slot. Released on drop, whichever way the start ends.
struct StartClaim<'a> {
    pending: &'a AtomicBool,
}

impl<'a> StartClaim<'a> {
    fn acquire(pending: &'a AtomicBool) -> Option<Self> {
        if pending.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { pending })
        }
    }
}

impl Drop for StartClaim<'_> {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Supervisor {
    pub fn new(
        registry: Registry,
        launcher: Arc<dyn Launcher>,
        probe: Arc<dyn HealthProbe>,
        timings: SupervisorTimings,
    ) -> Self {
        let store = StateStore::new(registry.ports());
        let locks = registry.ports().map(|port| (port, Mutex::new(()))).collect();
        let start_pending = registry
            .ports()
            .map(|port| (port, AtomicBool::new(false)))
            .collect();

        Self {
            registry,
            store,
            locks,
            start_pending,
            launcher,
            probe,
            timings,
            initialized: AtomicBool::new(false),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn timings(&self) -> &SupervisorTimings {
        &self.timings
    }

    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    pub fn get_state(&self, port: u16) -> Option<ServerState> {
        self.store.get(port)
    }

    pub fn get_all_states(&self) -> BTreeMap<u16, ServerState> {
        self.store.all()
    }

    pub fn subscribe(&self, port: u16) -> Option<watch::Receiver<ServerState>> {
        self.store.subscribe(port)
    }

    /// Reset every worker, adopt the ones already answering health checks,
    /// then auto-start the rest. Runs once.
    pub async fn initialize(&self) -> SupervisorResult<BTreeMap<u16, ServerState>> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(SupervisorError::AlreadyInitialized {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!("Initializing supervisor with {} workers", self.registry.len());

        join_all(self.registry.all().map(|definition| self.reconcile(definition))).await;

        let auto_start: Vec<u16> = self
            .registry
            .all()
            .filter(|definition| definition.auto_start)
            .map(|definition| definition.port)
            .collect();

        let results = join_all(auto_start.iter().map(|port| self.start(*port))).await;
        for (port, result) in auto_start.iter().zip(results) {
            if let Err(e) = result {
                warn!("Auto-start of worker on port {port} skipped: {e}");
            }
        }

        Ok(self.get_all_states())
    }

    /// Launch the worker unless it is already `Starting` or `Running`.
    ///
    /// At most one start per port is in flight: a start arriving while another
    /// is queued on the port lock or launching returns the current state
    /// without launching. Launch failures are recorded in the returned state,
    /// not returned as errors.
    pub async fn start(&self, port: u16) -> SupervisorResult<ServerState> {
        let definition = self.definition(port)?;

        if self.shutdown.is_shutdown() {
            return Err(SupervisorError::ShuttingDown {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let current = self.snapshot(port)?;
        if is_active(&current) {
            debug!("Worker on port {port} already {}", current.status());
            return Ok(current);
        }

        let Some(_claim) = StartClaim::acquire(self.pending_for(port)?) else {
            debug!("Start of worker on port {port} already pending");
            return Ok(current);
        };

        let _guard = self.lock_for(port)?.lock().await;

        let current = self.snapshot(port)?;
        if is_active(&current) {
            return Ok(current);
        }

        let starting = self.commit(current.to_starting());
        let pending = PendingLaunch::new(&self.store, port);

        let timeout = self.timings.launch_timeout;
        let outcome = tokio::time::timeout(timeout, self.launcher.launch(definition))
            .await
            .unwrap_or(Err(LaunchError::Timeout { timeout }));

        pending.settle();

        let next = match outcome {
            Ok(pid) => starting.to_running(Some(pid), None),
            Err(e) => {
                warn!("Failed to start {} on port {port}: {e}", definition.name);
                starting.to_error(e.to_string())
            }
        };

        Ok(self.commit(next))
    }

    /// Terminate the worker. A stop issued during a start waits for it to
    /// settle first.
    pub async fn stop(&self, port: u16) -> SupervisorResult<ServerState> {
        let definition = self.definition(port)?;
        let _guard = self.lock_for(port)?.lock().await;

        let current = self.snapshot(port)?;
        match current.status() {
            ServerStatus::Stopped => return Ok(current),
            ServerStatus::Error if current.pid().is_none() => return Ok(current),
            _ => {}
        }

        let timeout = self.timings.terminate_timeout + TERMINATE_MARGIN;
        let outcome = tokio::time::timeout(timeout, self.launcher.terminate(port))
            .await
            .unwrap_or(Err(TerminateError::Timeout { timeout }));

        let next = match outcome {
            Ok(()) => current.to_stopped(),
            Err(e) => {
                warn!("Failed to stop {} on port {port}: {e}", definition.name);
                current.to_error(e.to_string())
            }
        };

        Ok(self.commit(next))
    }

    /// Probe one worker now and apply the result.
    pub async fn check_health(&self, port: u16) -> SupervisorResult<ServerState> {
        let definition = self.definition(port)?;
        let _guard = self.lock_for(port)?.lock().await;

        let verdict = self.probe_with_timeout(definition).await;
        let now = Utc::now();
        let current = self.snapshot(port)?;

        let next = match (current.status(), verdict) {
            (ServerStatus::Running, HealthVerdict::Unhealthy) => current
                .with_health_check(now)
                .to_error(HEALTH_CHECK_FAILED),
            (ServerStatus::Error, HealthVerdict::Healthy) => {
                current.to_running(current.pid(), Some(now))
            }
            (ServerStatus::Stopped, HealthVerdict::Healthy) => {
                info!("Adopting {} already serving port {port}", definition.name);
                current.to_running(None, Some(now))
            }
            _ => current.with_health_check(now),
        };

        Ok(self.commit(next))
    }

    /// One sweep: probe every `Running` worker concurrently.
    pub async fn sweep(&self) -> SweepSummary {
        let targets: Vec<(&WorkerDefinition, Option<u32>)> = self
            .store
            .ports_with_status(ServerStatus::Running)
            .into_iter()
            .filter_map(|port| {
                let state = self.store.get(port).filter(ServerState::is_running)?;
                let definition = self.registry.by_port(port)?;
                Some((definition, state.pid()))
            })
            .collect();

        let outcomes = join_all(
            targets
                .iter()
                .map(|(definition, pid)| self.sweep_one(definition, *pid)),
        )
        .await;

        let mut summary = SweepSummary {
            probed: outcomes.len(),
            ..SweepSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                SweepOutcome::Healthy => summary.healthy += 1,
                SweepOutcome::Failed => summary.failed += 1,
                SweepOutcome::Skipped => summary.skipped += 1,
            }
        }

        summary
    }

    /// Run [`Supervisor::sweep`] on the configured interval until shutdown.
    /// The first sweep happens one interval after spawning.
    pub fn spawn_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        let mut guard = self.shutdown.subscribe_guard();
        let period = self.timings.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Health sweep every {period:?}");

            loop {
                tokio::select! {
                    _ = guard.wait() => {
                        debug!("Health sweep stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let summary = supervisor.sweep().await;
                        if summary.probed > 0 {
                            debug!(
                                "Sweep probed {} workers: {} healthy, {} failed, {} skipped",
                                summary.probed, summary.healthy, summary.failed, summary.skipped
                            );
                        }
                    }
                }
            }
        })
    }

    /// Stop the sweep and refuse new starts, then stop every worker that may
    /// own a process.
    pub async fn shutdown(&self) {
        self.shutdown.shutdown();

        let ports: Vec<u16> = self
            .store
            .all()
            .into_iter()
            .filter(|(_, state)| owns_process(state))
            .map(|(port, _)| port)
            .collect();

        if ports.is_empty() {
            return;
        }

        info!("Stopping {} workers", ports.len());

        let results = join_all(ports.iter().map(|port| self.stop(*port))).await;
        for (port, result) in ports.iter().zip(results) {
            match result {
                Ok(state) if state.status() == ServerStatus::Error => warn!(
                    "Worker on port {port} did not stop cleanly: {}",
                    state.error_message().unwrap_or_default()
                ),
                Ok(_) => {}
                Err(e) => warn!("Failed to stop worker on port {port}: {e}"),
            }
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    async fn reconcile(&self, definition: &WorkerDefinition) {
        let port = definition.port;
        let Some(lock) = self.locks.get(&port) else {
            return;
        };
        let _guard = lock.lock().await;

        let reset = self.commit(ServerState::stopped(port));
        let now = Utc::now();

        let next = match self.probe_with_timeout(definition).await {
            HealthVerdict::Healthy => {
                info!("{} already serving port {port}", definition.name);
                reset.to_running(None, Some(now))
            }
            HealthVerdict::Unhealthy => reset.with_health_check(now),
        };

        self.commit(next);
    }

    async fn sweep_one(&self, definition: &WorkerDefinition, pid: Option<u32>) -> SweepOutcome {
        let port = definition.port;
        let verdict = self.probe_with_timeout(definition).await;

        let Some(lock) = self.locks.get(&port) else {
            return SweepOutcome::Skipped;
        };
        let _guard = lock.lock().await;

        let Some(current) = self.store.get(port) else {
            return SweepOutcome::Skipped;
        };
        if !current.is_running() || current.pid() != pid {
            debug!("Worker on port {port} changed during sweep, discarding probe result");
            return SweepOutcome::Skipped;
        }

        let now = Utc::now();
        if verdict.is_healthy() {
            self.commit(current.with_health_check(now));
            SweepOutcome::Healthy
        } else {
            warn!("Health check failed for {} on port {port}", definition.name);
            self.commit(current.with_health_check(now).to_error(HEALTH_CHECK_FAILED));
            SweepOutcome::Failed
        }
    }

    async fn probe_with_timeout(&self, definition: &WorkerDefinition) -> HealthVerdict {
        tokio::time::timeout(self.timings.probe_timeout, self.probe.check(definition))
            .await
            .unwrap_or(HealthVerdict::Unhealthy)
    }

    fn commit(&self, next: ServerState) -> ServerState {
        if let Some(previous) = self.store.replace(next.clone())
            && previous.status() != next.status()
        {
            info!(
                "Worker on port {}: {} -> {}",
                next.port(),
                previous.status(),
                next.status()
            );
        }
        next
    }

    #[track_caller]
    fn definition(&self, port: u16) -> SupervisorResult<&WorkerDefinition> {
        match self.registry.by_port(port) {
            Some(definition) => Ok(definition),
            None => Err(SupervisorError::unknown_port(port)),
        }
    }

    #[track_caller]
    fn snapshot(&self, port: u16) -> SupervisorResult<ServerState> {
        match self.store.get(port) {
            Some(state) => Ok(state),
            None => Err(SupervisorError::unknown_port(port)),
        }
    }

    #[track_caller]
    fn pending_for(&self, port: u16) -> SupervisorResult<&AtomicBool> {
        match self.start_pending.get(&port) {
            Some(pending) => Ok(pending),
            None => Err(SupervisorError::unknown_port(port)),
        }
    }

    #[track_caller]
    fn lock_for(&self, port: u16) -> SupervisorResult<&Mutex<()>> {
        match self.locks.get(&port) {
            Some(lock) => Ok(lock),
            None => Err(SupervisorError::unknown_port(port)),
        }
    }
}

fn is_active(state: &ServerState) -> bool {
    matches!(
        state.status(),
        ServerStatus::Starting | ServerStatus::Running
    )
}

fn owns_process(state: &ServerState) -> bool {
    match state.status() {
        ServerStatus::Running | ServerStatus::Starting => true,
        ServerStatus::Error => state.pid().is_some(),
        ServerStatus::Stopped => false,
    }
}
