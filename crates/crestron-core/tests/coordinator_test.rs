#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::FakeHub;
use crestron_core::coordinator::OPTIMISTIC_COOLDOWN;
use crestron_core::{
    Coordinator, CoreError, EntityKey, HubApi, PlatformType, PollSettings, RefreshState,
};
use serde_json::json;

fn hub_with_lamp(level: u32) -> Arc<FakeHub> {
    let hub = Arc::new(FakeHub::new());
    hub.set_devices(vec![json!({
        "id": 1, "name": "Lamp", "roomName": "Den",
        "type": "Light", "subType": "Dimmer", "level": level,
    })]);
    hub
}

fn coordinator(hub: &Arc<FakeHub>) -> Coordinator {
    Coordinator::new(Arc::clone(hub) as Arc<dyn HubApi>, PollSettings::default())
}

fn lamp_level(coordinator: &Coordinator) -> u32 {
    coordinator
        .snapshot()
        .get(PlatformType::Light, 1)
        .map(|d| d.level)
        .unwrap()
}

// ── Refresh lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn first_refresh_failure_is_not_ready() {
    let hub = hub_with_lamp(0);
    hub.fail("devices");
    let coord = coordinator(&hub);

    let err = coord.first_refresh().await.unwrap_err();

    assert!(matches!(err, CoreError::NotReady { .. }));
    assert!(coord.snapshot().is_empty());
    assert!(!coord.last_update_success());
}

#[tokio::test]
async fn later_failure_keeps_stale_snapshot() {
    let hub = hub_with_lamp(500);
    let coord = coordinator(&hub);
    coord.first_refresh().await.unwrap();

    hub.set_devices(vec![]);
    hub.fail("sensors");
    let err = coord.request_refresh().await.unwrap_err();

    assert!(err.to_string().contains("sensors"));
    assert_eq!(lamp_level(&coord), 500);
    assert!(!coord.last_update_success());
    assert!(coord.last_error().is_some());

    hub.recover();
    coord.request_refresh().await.unwrap();
    assert!(coord.last_update_success());
    assert!(coord.last_error().is_none());
    assert!(coord.snapshot().is_empty());
}

#[tokio::test]
async fn refresh_returns_to_idle() {
    let hub = hub_with_lamp(0);
    let coord = coordinator(&hub);
    let state = coord.refresh_state();

    coord.request_refresh().await.unwrap();

    assert_eq!(*state.borrow(), RefreshState::Idle);
    assert_eq!(coord.last_changes().await.discovered.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_poll() {
    let hub = hub_with_lamp(0);
    hub.set_latency(Duration::from_millis(100));
    let coord = coordinator(&hub);

    let (a, b, c) = tokio::join!(
        coord.request_refresh(),
        coord.request_refresh(),
        coord.request_refresh(),
    );

    assert_eq!(hub.device_fetches(), 1);
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));

    coord.request_refresh().await.unwrap();
    assert_eq!(hub.device_fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn interval_task_polls_until_shutdown() {
    let hub = hub_with_lamp(0);
    let coord = coordinator(&hub);
    coord.first_refresh().await.unwrap();
    coord.start().await;

    tokio::time::sleep(coord.interval() + Duration::from_millis(10)).await;
    assert_eq!(hub.device_fetches(), 2);

    coord.shutdown().await;
    tokio::time::sleep(coord.interval() * 3).await;
    assert_eq!(hub.device_fetches(), 2);
}

// ── Subscribers ─────────────────────────────────────────────────────

#[tokio::test]
async fn listeners_run_after_publish_until_dropped() {
    let hub = hub_with_lamp(0);
    let coord = coordinator(&hub);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let handle = coord.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    coord.request_refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    hub.fail("devices");
    let _ = coord.request_refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    hub.recover();
    drop(handle);
    coord.request_refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn watch_snapshot_sees_publications() {
    let hub = hub_with_lamp(1_000);
    let coord = coordinator(&hub);
    let mut rx = coord.watch_snapshot();

    coord.request_refresh().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.count(PlatformType::Light), 1);
}

// ── Optimistic suppression ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn suppression_expires_after_cooldown() {
    let hub = hub_with_lamp(0);
    let coord = coordinator(&hub);
    let key = EntityKey::new(PlatformType::Light, 1);

    assert!(!coord.is_suppressed(&key));
    coord.suppress(key);
    assert!(coord.is_suppressed(&key));
    assert!(!coord.is_suppressed(&EntityKey::new(PlatformType::Shade, 1)));

    tokio::time::advance(OPTIMISTIC_COOLDOWN + Duration::from_millis(1)).await;
    assert!(!coord.is_suppressed(&key));
}
