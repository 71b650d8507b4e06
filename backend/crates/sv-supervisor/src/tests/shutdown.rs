use crate::{ShutdownCoordinator, ShutdownGuard};

use tokio::time::{Duration, timeout};

#[tokio::test]
async fn given_coordinator_when_shutdown_triggered_then_guard_released() {
    let coordinator = ShutdownCoordinator::new();
    let mut guard = ShutdownGuard::new(&coordinator);

    let trigger = coordinator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.shutdown();
    });

    let result = timeout(Duration::from_millis(500), guard.wait()).await;
    assert!(result.is_ok(), "Shutdown signal should be received");
}

#[tokio::test]
async fn given_shutdown_already_triggered_when_guard_created_then_wait_returns() {
    let coordinator = ShutdownCoordinator::new();
    coordinator.shutdown();

    let mut guard = coordinator.subscribe_guard();

    assert!(guard.is_shutdown());
    assert!(timeout(Duration::from_millis(10), guard.wait()).await.is_ok());
}

#[test]
fn given_new_coordinator_when_checked_then_not_shutdown() {
    let coordinator = ShutdownCoordinator::new();
    let guard = coordinator.subscribe_guard();

    assert!(!coordinator.is_shutdown());
    assert!(!guard.is_shutdown());
}

#[test]
fn given_shutdown_called_twice_then_still_shutdown() {
    let coordinator = ShutdownCoordinator::default();

    coordinator.shutdown();
    coordinator.shutdown();

    assert!(coordinator.is_shutdown());
}
