use crate::tests::{FakeLauncher, FakeProbe, definition, supervisor_with, two_workers};
use crate::{HEALTH_CHECK_FAILED, HealthVerdict, LAUNCH_INTERRUPTED, ServerStatus};

use std::sync::Arc;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, eq, err, ok};
use tokio::time::Instant;

// =========================================================================
// start
// =========================================================================

#[tokio::test(start_paused = true)]
async fn given_stopped_worker_when_start_then_running_with_pid() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();

    // When
    let state = supervisor.start(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(state.pid(), Some(4000));
    assert_eq!(state.error_message(), None);
    assert_eq!(launcher.launches(), vec![8001]);
    assert_eq!(supervisor.get_state(8001), Some(state));
}

#[tokio::test(start_paused = true)]
async fn given_launch_failure_when_start_then_error_with_message() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");

    // When
    let state = supervisor.start(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some("binary not found"));
    assert_eq!(state.pid(), None);
}

#[tokio::test(start_paused = true)]
async fn given_error_worker_when_start_then_launch_is_retried() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");
    supervisor.start(8001).await.unwrap();
    launcher.clear_failures();

    // When
    let state = supervisor.start(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(state.error_message(), None);
    assert_eq!(launcher.launches(), vec![8001, 8001]);
}

#[tokio::test(start_paused = true)]
async fn given_running_worker_when_start_then_no_second_launch() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    let first = supervisor.start(8001).await.unwrap();

    // When
    let second = supervisor.start(8001).await.unwrap();

    // Then
    assert_eq!(first, second);
    assert_eq!(launcher.launches().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn given_concurrent_starts_on_same_port_when_awaited_then_single_launch() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(100));

    // When
    let (a, b) = tokio::join!(supervisor.start(8001), supervisor.start(8001));

    // Then
    for state in [a.unwrap(), b.unwrap()] {
        assert!(matches!(
            state.status(),
            ServerStatus::Starting | ServerStatus::Running
        ));
    }
    assert_eq!(launcher.launches(), vec![8001]);
    assert_eq!(
        supervisor.get_state(8001).unwrap().status(),
        ServerStatus::Running
    );
}

#[tokio::test(start_paused = true)]
async fn given_check_holding_lock_when_two_starts_race_then_single_failed_launch() {
    // Given
    let (supervisor, launcher, probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");
    supervisor.start(8001).await.unwrap();
    probe.delay(8001, Duration::from_millis(500));
    let check = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.check_health(8001).await })
    };
    while probe.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    // When
    let (a, b) = tokio::join!(supervisor.start(8001), supervisor.start(8001));

    // Then
    assert_eq!(a.unwrap().status(), ServerStatus::Error);
    assert_eq!(b.unwrap().status(), ServerStatus::Error);
    assert_that!(check.await.unwrap(), ok(anything()));
    assert_eq!(launcher.launches(), vec![8001, 8001]);
}

#[tokio::test(start_paused = true)]
async fn given_stop_holding_lock_when_two_starts_race_then_single_launch() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    supervisor.start(8001).await.unwrap();
    launcher.fail_terminate(8001, "permission denied");
    supervisor.stop(8001).await.unwrap();
    launcher.clear_failures();
    launcher.set_terminate_delay(Duration::from_millis(500));
    let stop = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.stop(8001).await })
    };
    while launcher.terminations().len() < 2 {
        tokio::task::yield_now().await;
    }

    // When
    let (a, b) = tokio::join!(supervisor.start(8001), supervisor.start(8001));

    // Then
    let statuses = [a.unwrap().status(), b.unwrap().status()];
    assert!(statuses.contains(&ServerStatus::Running));
    assert!(statuses.contains(&ServerStatus::Error));
    assert_eq!(stop.await.unwrap().unwrap().status(), ServerStatus::Stopped);
    assert_eq!(launcher.launches(), vec![8001, 8001]);
}

#[tokio::test(start_paused = true)]
async fn given_pending_start_dropped_when_start_again_then_launch_proceeds() {
    // Given
    let (supervisor, launcher, probe) = two_workers();
    probe.delay(8001, Duration::from_millis(500));
    let check = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.check_health(8001).await })
    };
    while probe.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    let abandoned = tokio::time::timeout(Duration::from_millis(10), supervisor.start(8001)).await;
    assert!(abandoned.is_err());

    // When
    let state = supervisor.start(8001).await.unwrap();

    // Then
    check.await.unwrap().unwrap();
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(launcher.launches(), vec![8001]);
}

#[tokio::test(start_paused = true)]
async fn given_two_ports_when_started_together_then_launches_overlap() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(100));
    let began = Instant::now();

    // When
    let (a, b) = tokio::join!(supervisor.start(8001), supervisor.start(8002));

    // Then
    assert_eq!(a.unwrap().status(), ServerStatus::Running);
    assert_eq!(b.unwrap().status(), ServerStatus::Running);
    assert!(began.elapsed() < Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn given_hanging_launch_when_start_then_error_after_timeout() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_secs(3600));

    // When
    let state = supervisor.start(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    let message = state.error_message().unwrap_or_default().to_string();
    assert_that!(message, contains_substring("timed out"));
}

#[tokio::test(start_paused = true)]
async fn given_in_flight_start_when_request_dropped_then_worker_not_stuck_starting() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(100));

    // When
    let abandoned = tokio::time::timeout(Duration::from_millis(10), supervisor.start(8001)).await;

    // Then
    assert!(abandoned.is_err());
    let state = supervisor.get_state(8001).unwrap();
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some(LAUNCH_INTERRUPTED));
}

#[tokio::test(start_paused = true)]
async fn given_unknown_port_when_start_then_error() {
    let (supervisor, launcher, _probe) = two_workers();

    let result = supervisor.start(9999).await;

    assert_that!(result, err(anything()));
    assert!(launcher.launches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_start_when_subscribed_then_every_transition_observed() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(50));
    let mut rx = supervisor.subscribe(8001).unwrap();
    let task = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.start(8001).await })
    };

    // When
    rx.changed().await.unwrap();
    let first = rx.borrow_and_update().status();
    rx.changed().await.unwrap();
    let second = rx.borrow_and_update().status();

    // Then
    assert_eq!(first, ServerStatus::Starting);
    assert_eq!(second, ServerStatus::Running);
    assert_that!(task.await.unwrap(), ok(anything()));
}

// =========================================================================
// stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn given_running_worker_when_stop_then_stopped_without_pid() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    supervisor.start(8001).await.unwrap();

    // When
    let state = supervisor.stop(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Stopped);
    assert_eq!(state.pid(), None);
    assert_eq!(launcher.terminations(), vec![8001]);
}

#[tokio::test(start_paused = true)]
async fn given_stopped_worker_when_stop_then_noop() {
    let (supervisor, launcher, _probe) = two_workers();

    let state = supervisor.stop(8001).await.unwrap();

    assert_eq!(state.status(), ServerStatus::Stopped);
    assert!(launcher.terminations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_terminate_failure_when_stop_then_error_keeps_pid() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    let running = supervisor.start(8001).await.unwrap();
    launcher.fail_terminate(8001, "permission denied");

    // When
    let state = supervisor.stop(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some("permission denied"));
    assert_eq!(state.pid(), running.pid());
}

#[tokio::test(start_paused = true)]
async fn given_error_with_pid_when_stop_retried_then_stopped() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    supervisor.start(8001).await.unwrap();
    launcher.fail_terminate(8001, "permission denied");
    supervisor.stop(8001).await.unwrap();
    launcher.clear_failures();

    // When
    let state = supervisor.stop(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Stopped);
    assert_eq!(launcher.terminations(), vec![8001, 8001]);
}

#[tokio::test(start_paused = true)]
async fn given_failed_launch_when_stop_then_error_left_alone() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");
    supervisor.start(8001).await.unwrap();

    // When
    let state = supervisor.stop(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert!(launcher.terminations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_start_in_flight_when_stop_then_stop_waits_and_applies() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(100));
    let start = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.start(8001).await })
    };
    while supervisor.get_state(8001).unwrap().status() != ServerStatus::Starting {
        tokio::task::yield_now().await;
    }

    // When
    let stopped = supervisor.stop(8001).await.unwrap();

    // Then
    let started = start.await.unwrap().unwrap();
    assert_eq!(started.status(), ServerStatus::Running);
    assert_eq!(stopped.status(), ServerStatus::Stopped);
    assert_eq!(launcher.launches(), vec![8001]);
    assert_eq!(launcher.terminations(), vec![8001]);
}

#[tokio::test(start_paused = true)]
async fn given_failing_start_in_flight_when_stop_then_stop_is_noop() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.set_launch_delay(Duration::from_millis(100));
    launcher.fail_launch(8001, "binary not found");
    let start = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.start(8001).await })
    };
    while supervisor.get_state(8001).unwrap().status() != ServerStatus::Starting {
        tokio::task::yield_now().await;
    }

    // When
    let state = supervisor.stop(8001).await.unwrap();

    // Then
    start.await.unwrap().unwrap();
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some("binary not found"));
    assert!(launcher.terminations().is_empty());
}

// =========================================================================
// check_health
// =========================================================================

#[tokio::test(start_paused = true)]
async fn given_error_worker_when_manual_check_healthy_then_running() {
    // Given
    let (supervisor, launcher, probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");
    supervisor.start(8001).await.unwrap();
    probe.set(8001, HealthVerdict::Healthy);

    // When
    let state = supervisor.check_health(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(state.error_message(), None);
    assert!(state.last_health_check().is_some());
}

#[tokio::test(start_paused = true)]
async fn given_error_worker_when_manual_check_unhealthy_then_only_timestamp_moves() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    launcher.fail_launch(8001, "binary not found");
    supervisor.start(8001).await.unwrap();

    // When
    let state = supervisor.check_health(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some("binary not found"));
    assert!(state.last_health_check().is_some());
}

#[tokio::test(start_paused = true)]
async fn given_running_worker_when_manual_check_unhealthy_then_error() {
    // Given
    let (supervisor, _launcher, _probe) = two_workers();
    let running = supervisor.start(8001).await.unwrap();

    // When
    let state = supervisor.check_health(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert_eq!(state.error_message(), Some(HEALTH_CHECK_FAILED));
    assert_eq!(state.pid(), running.pid());
}

#[tokio::test(start_paused = true)]
async fn given_running_worker_when_manual_check_healthy_then_timestamp_refreshed() {
    // Given
    let (supervisor, _launcher, probe) = two_workers();
    probe.set(8001, HealthVerdict::Healthy);
    let running = supervisor.start(8001).await.unwrap();
    assert_eq!(running.last_health_check(), None);

    // When
    let state = supervisor.check_health(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(state.pid(), running.pid());
    assert!(state.last_health_check().is_some());
}

#[tokio::test(start_paused = true)]
async fn given_stopped_port_already_served_when_manual_check_then_adopted() {
    // Given
    let (supervisor, launcher, probe) = two_workers();
    probe.set(8002, HealthVerdict::Healthy);

    // When
    let state = supervisor.check_health(8002).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Running);
    assert_eq!(state.pid(), None);
    assert!(launcher.launches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_hanging_probe_when_manual_check_then_unhealthy_after_timeout() {
    // Given
    let (supervisor, _launcher, probe) = two_workers();
    supervisor.start(8001).await.unwrap();
    probe.hang(8001);
    let began = Instant::now();

    // When
    let state = supervisor.check_health(8001).await.unwrap();

    // Then
    assert_eq!(state.status(), ServerStatus::Error);
    assert_that!(
        began.elapsed().as_secs(),
        eq(supervisor.timings().probe_timeout.as_secs())
    );
}

// =========================================================================
// initialize / shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn given_auto_start_worker_when_initialize_then_running() {
    // Given
    let launcher = Arc::new(FakeLauncher::new());
    let probe = Arc::new(FakeProbe::new());
    let supervisor = supervisor_with(
        vec![
            definition("rpm", 8001).with_auto_start(true),
            definition("aggregator", 8002),
        ],
        &launcher,
        &probe,
    );

    // When
    let states = supervisor.initialize().await.unwrap();

    // Then
    let rpm = &states[&8001];
    assert_eq!(rpm.status(), ServerStatus::Running);
    assert!(rpm.pid().is_some());
    assert_eq!(states[&8002].status(), ServerStatus::Stopped);
    assert_eq!(launcher.launches(), vec![8001]);
}

#[tokio::test(start_paused = true)]
async fn given_worker_already_serving_when_initialize_then_adopted_without_launch() {
    // Given
    let launcher = Arc::new(FakeLauncher::new());
    let probe = Arc::new(FakeProbe::new());
    probe.set(8001, HealthVerdict::Healthy);
    let supervisor = supervisor_with(
        vec![definition("rpm", 8001).with_auto_start(true)],
        &launcher,
        &probe,
    );

    // When
    let states = supervisor.initialize().await.unwrap();

    // Then
    assert_eq!(states[&8001].status(), ServerStatus::Running);
    assert_eq!(states[&8001].pid(), None);
    assert!(launcher.launches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_auto_start_launch_fails_when_initialize_then_error_and_others_unaffected() {
    // Given
    let launcher = Arc::new(FakeLauncher::new());
    let probe = Arc::new(FakeProbe::new());
    launcher.fail_launch(8001, "binary not found");
    let supervisor = supervisor_with(
        vec![
            definition("rpm", 8001).with_auto_start(true),
            definition("aggregator", 8002).with_auto_start(true),
        ],
        &launcher,
        &probe,
    );

    // When
    let states = supervisor.initialize().await.unwrap();

    // Then
    assert_eq!(states[&8001].status(), ServerStatus::Error);
    assert_eq!(states[&8001].error_message(), Some("binary not found"));
    assert_eq!(states[&8002].status(), ServerStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn given_initialized_supervisor_when_initialize_again_then_error() {
    let (supervisor, _launcher, _probe) = two_workers();
    supervisor.initialize().await.unwrap();

    let result = supervisor.initialize().await;

    assert_that!(result, err(anything()));
}

#[tokio::test(start_paused = true)]
async fn given_running_workers_when_shutdown_then_all_stopped_and_starts_refused() {
    // Given
    let (supervisor, launcher, _probe) = two_workers();
    supervisor.start(8001).await.unwrap();
    supervisor.start(8002).await.unwrap();

    // When
    supervisor.shutdown().await;

    // Then
    let mut terminated = launcher.terminations();
    terminated.sort_unstable();
    assert_eq!(terminated, vec![8001, 8002]);
    for state in supervisor.get_all_states().values() {
        assert_eq!(state.status(), ServerStatus::Stopped);
    }
    assert!(supervisor.is_shutting_down());
    assert_that!(supervisor.start(8001).await, err(anything()));
}
