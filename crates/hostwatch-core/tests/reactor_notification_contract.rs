//! Contract Test: Reactor Notifications
//!
//! The network reactor reports a host only when it actually changed.
//!
//! Constraints verified:
//! - start() reports the startup discovery result through the callback
//! - A connectivity change that resolves the same host reports nothing
//! - A connectivity change that resolves a new host reports it once and
//!   broadcasts backend-ip-changed
//! - "Disconnected" changes trigger no probing
//! - A discovery already running at start() is waited for and reported
//! - stop() is idempotent and nothing is reported afterwards, including
//!   on a reactor that never started
//!
//! If this test fails, someone has added:
//! - Notifications for unchanged hosts
//! - Discovery on disconnect
//! - Work after stop()

mod common;

use common::*;
use hostwatch_core::traits::ConnectivityStatus;
use hostwatch_core::{Platform, Signal};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const A: &str = "192.168.8.184";
const B: &str = "10.0.2.2";

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |host: &str| sink.lock().unwrap().push(host.to_string()))
}

fn reported(seen: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    seen.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn startup_result_is_reported_without_broadcast() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Up);
    let rig = Rig::native(&[A, B], health.clone());
    let mut signals = rig.hostwatch.events().subscribe();
    let (seen, on_change) = recorder();

    rig.hostwatch.init(on_change).await;

    assert!(eventually(|| reported(&seen) == vec![A]).await);
    assert!(rig.hostwatch.reactor().is_running());
    assert_eq!(rig.hostwatch.last_known_host().await.as_deref(), Some(A));
    assert!(signals.try_recv().is_err());

    rig.hostwatch.dispose();
}

#[tokio::test(start_paused = true)]
async fn startup_waits_for_running_discovery() {
    let gate = Arc::new(Notify::new());
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Gated(gate.clone()));
    let rig = Rig::native(&[A, B], health.clone());
    let (seen, on_change) = recorder();

    let discoverer = Arc::clone(rig.hostwatch.discoverer());
    let background = tokio::spawn(async move { discoverer.discover().await });
    assert!(eventually(|| health.call_count() == 1).await);

    rig.hostwatch.init(on_change).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(reported(&seen).is_empty());
    assert_eq!(health.call_count(), 1);

    gate.notify_one();

    assert!(eventually(|| reported(&seen) == vec![A]).await);
    assert_eq!(background.await.unwrap().as_deref(), Some(A));
    assert_eq!(rig.hostwatch.reactor().last_host().as_deref(), Some(A));
    assert_eq!(health.call_count(), 1);

    rig.hostwatch.dispose();
}

#[tokio::test(start_paused = true)]
async fn only_host_changes_are_reported() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Up);
    let rig = Rig::native(&[A, B], health.clone());
    let mut signals = rig.hostwatch.events().subscribe();
    let (seen, on_change) = recorder();

    rig.hostwatch.init(on_change).await;
    assert!(eventually(|| reported(&seen).len() == 1).await);

    // same network again: cached A still answers
    let probes = health.call_count();
    rig.connectivity.publish(online());
    assert!(eventually(|| health.call_count() > probes).await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(reported(&seen), vec![A]);
    assert!(signals.try_recv().is_err());

    // A goes away, B comes up
    health.set(A, Reply::Down);
    health.set(B, Reply::Up);
    rig.connectivity.publish(online());

    assert!(eventually(|| reported(&seen) == vec![A, B]).await);
    assert_eq!(
        signals.recv().await.unwrap(),
        Signal::BackendHostChanged {
            address: B.to_string()
        }
    );
    assert_eq!(rig.hostwatch.reactor().last_host().as_deref(), Some(B));
    assert_eq!(rig.persisted_host().await.as_deref(), Some(B));

    rig.hostwatch.dispose();
}

#[tokio::test(start_paused = true)]
async fn disconnect_does_not_probe() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Up);
    let rig = Rig::native(&[A], health.clone());
    let (seen, on_change) = recorder();

    rig.hostwatch.init(on_change).await;
    assert!(eventually(|| reported(&seen).len() == 1).await);
    let probes = health.call_count();

    rig.connectivity.publish(ConnectivityStatus::disconnected());
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(health.call_count(), probes);
    assert_eq!(reported(&seen), vec![A]);

    rig.hostwatch.dispose();
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_final() {
    let health = ScriptedHealthCheck::new();
    health.set(A, Reply::Up);
    let rig = Rig::native(&[A, B], health.clone());
    let (seen, on_change) = recorder();

    rig.hostwatch.init(on_change).await;
    assert!(eventually(|| reported(&seen).len() == 1).await);

    rig.hostwatch.dispose();
    rig.hostwatch.dispose();
    assert!(eventually(|| !rig.hostwatch.reactor().is_running()).await);

    let probes = health.call_count();
    health.set(A, Reply::Down);
    health.set(B, Reply::Up);
    rig.connectivity.publish(online());
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(health.call_count(), probes);
    assert_eq!(reported(&seen), vec![A]);
}

#[tokio::test(start_paused = true)]
async fn web_platform_does_not_start_reactor() {
    let health = ScriptedHealthCheck::new();
    let rig = Rig::build(
        config_with(&[A], Platform::Web),
        hostwatch_core::MemoryStore::new(),
        health.clone(),
        RecordingTransport::ok(),
    );
    let (seen, on_change) = recorder();

    let config = rig.hostwatch.init(on_change).await;

    assert_eq!(config.base_url, "https://srv1265534.hstgr.cloud");
    assert!(!rig.hostwatch.reactor().is_running());

    // tearing down a reactor that never ran is a no-op
    rig.hostwatch.dispose();
    rig.hostwatch.dispose();
    rig.hostwatch.reactor().stop();
    assert!(!rig.hostwatch.reactor().is_running());

    rig.connectivity.publish(online());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(health.call_count(), 0);
    assert!(reported(&seen).is_empty());
}
