//! End-to-end behaviour of a store handle against a recording remote

mod support;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keyward_common::assert_eventually_async;
use keyward_core::{SchedulerState, Store};
use keyward_domain::constants::{
    AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL, STUDIO_ENABLED, VERBOSE_LOGGING,
};
use keyward_domain::{Key, Value};
use support::{players_store, RecordingRemote, RemoteCall};

#[tokio::test(start_paused = true)]
async fn players_scenario() {
    let remote = RecordingRemote::new();
    let store = players_store(&remote);

    store.set(42, "Alice");
    assert_eq!(store.get(42).await, Some(Value::from("Alice")));
    assert!(remote.calls().is_empty(), "cached read must not reach the remote");

    remote.fail_next_puts(2);
    let started = tokio::time::Instant::now();
    let report = store.save_key(42).await;

    assert_eq!(report.saved, vec![Key::from(42)]);
    assert_eq!(remote.put_count(), 3);
    assert!(!store.cache().contains(&Key::from(42)));
    // Backoff after failures 1 and 2: (2 + 0.5) + (4 + 0.5) units
    assert_eq!(started.elapsed(), Duration::from_secs(7));

    let calls_before = remote.calls().len();
    let report = store.save_all().await;
    assert_eq!(report.attempted(), 0);
    assert_eq!(remote.calls().len(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn saved_key_is_reloaded_from_remote() {
    let remote = RecordingRemote::new();
    let store = players_store(&remote);

    store.set("alice", 5);
    store.save_key("alice").await;
    assert_eq!(store.get("alice").await, Some(Value::from(5)));

    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Put(Key::from("alice"), Value::from(5)),
            RemoteCall::Get(Key::from("alice")),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn transient_read_failures_are_retried() {
    let remote = RecordingRemote::new().with_value("alice", "remote");
    remote.fail_next_gets(3);
    let store = players_store(&remote);

    assert_eq!(store.get("alice").await, Some(Value::from("remote")));
    assert_eq!(remote.get_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn persistent_write_failure_keeps_value_cached() {
    let remote = RecordingRemote::new();
    remote.fail_next_puts(u32::MAX);
    let store = players_store(&remote);

    store.set("alice", "v1");
    let report = store.save_key("alice").await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(remote.put_count(), 5);
    assert_eq!(store.get("alice").await, Some(Value::from("v1")));
    assert_eq!(remote.get_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn non_production_writes_need_studio_access() {
    let remote = RecordingRemote::new();
    let store = Store::builder("Players", remote.clone())
        .environment(Arc::new(|| true))
        .build()
        .expect("store should build");

    store.set("alice", 1);
    assert!(store.save_all().await.gated);
    assert_eq!(remote.put_count(), 0);
    assert!(store.cache().contains(&Key::from("alice")));

    store.set_setting(STUDIO_ENABLED, true);
    let report = store.save_all().await;
    assert_eq!(report.saved, vec![Key::from("alice")]);
}

#[tokio::test(start_paused = true)]
async fn invalid_setting_names_change_nothing() {
    let store = players_store(&RecordingRemote::new());
    let fired = Arc::new(AtomicU32::new(0));
    let before = store.settings();

    let fired_clone = Arc::clone(&fired);
    store.subscribe("Verbose", move |_| {
        fired_clone.fetch_add(1, Ordering::SeqCst);
    });
    store.set_setting("Verbose", false);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.settings(), before);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_every_set() {
    let store = players_store(&RecordingRemote::new());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let seen_clone = Arc::clone(&seen);
    store.subscribe(VERBOSE_LOGGING, move |value| seen_clone.lock().push(value));
    store.set_setting(VERBOSE_LOGGING, true);
    store.set_setting(VERBOSE_LOGGING, true);

    assert_eventually_async!(Duration::from_secs(1), async { seen.lock().len() == 2 });
}

#[tokio::test(start_paused = true)]
async fn autosave_toggle_converges_on_final_settings() {
    let remote = RecordingRemote::new();
    let store = players_store(&remote);

    store.set_setting(AUTO_SAVE_INTERVAL, 30);
    store.set_setting(AUTO_SAVE_ENABLED, true);
    store.set_setting(AUTO_SAVE_ENABLED, false);
    store.set_setting(AUTO_SAVE_INTERVAL, 15);
    store.set_setting(AUTO_SAVE_ENABLED, true);
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(store.scheduler_state(), SchedulerState::Armed { interval: Duration::from_secs(15) });

    store.set("alice", 1);
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(store.autosave_ticks(), 1);
    assert_eq!(remote.stored("alice"), Some(Value::from(1)));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.autosave_ticks(), 3);
}

#[tokio::test(start_paused = true)]
async fn close_flushes_pending_writes() {
    let remote = RecordingRemote::new();
    let store = players_store(&remote);
    store.set(1, "one");
    store.set(2, "two");

    let report = store.close().await;

    assert!(report.is_success());
    assert_eq!(remote.stored(1), Some(Value::from("one")));
    assert_eq!(remote.stored(2), Some(Value::from("two")));
}
