//! Contract Test: Single-Flight Discovery
//!
//! At most one discovery run may execute at a time.
//!
//! Constraints verified:
//! - A discover() issued while another is running returns None at once
//! - The running sequence is not duplicated or interleaved
//! - The slot is released when the run ends, whatever its outcome
//! - resolve() joins a running sequence and shares its result
//!
//! If this test fails, someone has added:
//! - Queuing or joining of concurrent discover() calls
//! - A flag that is not cleared on every exit path

mod common;

use common::*;
use std::sync::Arc;
use tokio::sync::Notify;

const A: &str = "192.168.8.184";
const B: &str = "10.0.2.2";

#[tokio::test(start_paused = true)]
async fn concurrent_discover_is_a_noop() {
    let gate = Arc::new(Notify::new());
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Gated(gate.clone()));
    let rig = Arc::new(Rig::native(&[A, B], health.clone()));

    let first = {
        let rig = rig.clone();
        tokio::spawn(async move { rig.hostwatch.discoverer().discover().await })
    };

    // wait until the first run is blocked inside its first probe
    assert!(eventually(|| health.call_count() == 1).await);
    assert!(rig.hostwatch.discoverer().is_discovering());

    let second = rig.hostwatch.discoverer().discover().await;
    assert_eq!(second, None);
    assert_eq!(health.calls(), vec![A], "second call must not probe");

    gate.notify_one();
    assert_eq!(first.await.unwrap().as_deref(), Some(A));
    assert_eq!(health.calls(), vec![A]);
    assert!(!rig.hostwatch.discoverer().is_discovering());
}

#[tokio::test(start_paused = true)]
async fn slot_is_released_after_failed_run() {
    let health = ScriptedHealthCheck::new();
    let rig = Rig::native(&[A], health.clone());

    assert_eq!(rig.hostwatch.discoverer().discover().await, None);
    assert!(!rig.hostwatch.discoverer().is_discovering());

    health.set(A, Reply::Up);
    assert_eq!(
        rig.hostwatch.discoverer().discover().await.as_deref(),
        Some(A)
    );
}

#[tokio::test(start_paused = true)]
async fn slot_is_released_when_run_is_cancelled() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Hang);
    let rig = Rig::native(&[A], health.clone());

    let cancelled = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        rig.hostwatch.discoverer().discover(),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(!rig.hostwatch.discoverer().is_discovering());

    health.set(A, Reply::Up);
    assert_eq!(
        rig.hostwatch.discoverer().discover().await.as_deref(),
        Some(A)
    );
}

#[tokio::test(start_paused = true)]
async fn resolve_shares_the_running_result() {
    let gate = Arc::new(Notify::new());
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Gated(gate.clone()));
    let rig = Arc::new(Rig::native(&[A, B], health.clone()));

    let first = {
        let rig = rig.clone();
        tokio::spawn(async move { rig.hostwatch.discoverer().discover().await })
    };
    assert!(eventually(|| health.call_count() == 1).await);

    let (joined, ()) = tokio::join!(rig.hostwatch.discoverer().resolve(), async {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        gate.notify_one();
    });

    assert_eq!(joined.as_deref(), Some(A));
    assert_eq!(first.await.unwrap().as_deref(), Some(A));
    assert_eq!(health.calls(), vec![A], "the waiter must not start its own search");
}

#[tokio::test(start_paused = true)]
async fn resolve_sees_none_when_running_search_is_cancelled() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Hang);
    let rig = Arc::new(Rig::native(&[A], health.clone()));

    let first = {
        let rig = rig.clone();
        tokio::spawn(async move { rig.hostwatch.discoverer().discover().await })
    };
    assert!(eventually(|| health.call_count() == 1).await);

    let (joined, ()) = tokio::join!(rig.hostwatch.discoverer().resolve(), async {
        first.abort();
    });

    assert_eq!(joined, None);
    assert!(!rig.hostwatch.discoverer().is_discovering());
    assert_eq!(health.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn resolve_searches_when_idle() {
    let health = ScriptedHealthCheck::new();
    health.set(B, Reply::Up);
    let rig = Rig::native(&[A, B], health.clone());

    assert_eq!(
        rig.hostwatch.discoverer().resolve().await.as_deref(),
        Some(B)
    );
    assert_eq!(health.calls(), vec![A, A, B]);
    assert_eq!(rig.persisted_host().await.as_deref(), Some(B));
}
