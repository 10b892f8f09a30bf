//! Shared store reconciliation against the in-memory blob store

mod common;

use std::{sync::Arc, time::Duration};

use light_timers::{
    services::{BlobStore, MemoryBlobStore, Metadata, Participant, Reconciler, Scope},
    state::{timer::Timer, DEFAULT_STORE_KEY},
    tasks::spawn_all,
    utils::{Clock, ManualClock},
    TimerError,
};
use serde_json::json;

use common::Room;

fn reconciler(store: Arc<MemoryBlobStore>, clock: Arc<ManualClock>) -> Reconciler {
    Reconciler::new(store, DEFAULT_STORE_KEY, clock)
}

#[tokio::test]
async fn create_appends_running_timer_with_owner() {
    let room = Room::new();
    let client = room.join("p1", "Aria");

    let timer = client.state.create_timer(Some("Torch".into()), 600_000).await.unwrap();
    assert_eq!(timer.start_at, Some(room.clock.now_ms()));
    assert_eq!(timer.offset_ms, 0);

    let stored = client.state.reconciler.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, timer.id);
    assert_eq!(stored[0].owner_id.as_deref(), Some("p1"));
    assert_eq!(stored[0].owner_name.as_deref(), Some("Aria"));
    assert!(stored[0].is_running(room.clock.now_ms()));
}

#[tokio::test]
async fn create_refuses_short_durations() {
    let room = Room::new();
    let client = room.join("p1", "Aria");

    let result = client.state.create_timer(None, 999).await;
    assert!(matches!(result, Err(TimerError::DurationTooShort { got: 999 })));
    assert!(client.state.reconciler.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_refuses_durations_past_one_year() {
    let room = Room::new();
    let client = room.join("p1", "Aria");

    let result = client.state.create_timer(None, i64::MAX).await;
    assert!(matches!(result, Err(TimerError::DurationTooLong { got: i64::MAX, .. })));
    assert!(client.state.reconciler.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_removes_by_id_only() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    let torch = client.state.create_timer(Some("Torch".into()), 60_000).await.unwrap();
    let lantern = client.state.create_timer(Some("Lantern".into()), 60_000).await.unwrap();

    assert!(client.state.delete_timer(&torch.id).await.unwrap());
    assert!(!client.state.delete_timer(&torch.id).await.unwrap());

    let stored = client.state.reconciler.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, lantern.id);
}

#[tokio::test]
async fn start_resets_expired_and_resumes_paused() {
    let room = Room::new();
    let now = room.clock.now_ms();
    let mut patch = Metadata::new();
    patch.insert(
        DEFAULT_STORE_KEY.to_string(),
        json!([
            { "id": "expired", "durationMs": 1000, "startAt": now - 5000 },
            { "id": "paused", "durationMs": 10000, "pausedAt": now - 100, "offsetMs": 4000 },
        ]),
    );
    room.store.set(patch).await.unwrap();

    let client = room.join("p1", "Aria");
    let timers = client.state.start_timers(&Scope::All).await.unwrap();

    let expired = timers.iter().find(|t| t.id == "expired").unwrap();
    assert_eq!(expired.offset_ms, 0);
    assert_eq!(expired.start_at, Some(now));
    assert_eq!(expired.remaining(now), 1000);

    let paused = timers.iter().find(|t| t.id == "paused").unwrap();
    assert_eq!(paused.offset_ms, 4000);
    assert_eq!(paused.start_at, Some(now));
    assert_eq!(paused.paused_at, None);
    assert_eq!(paused.remaining(now), 6000);
}

#[tokio::test]
async fn start_is_idempotent_for_running_timers() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    let timer = client.state.create_timer(None, 60_000).await.unwrap();

    room.clock.advance(7_000);
    let timers = client.state.start_timers(&Scope::All).await.unwrap();
    assert_eq!(timers[0].start_at, timer.start_at);
    assert_eq!(timers[0].offset_ms, timer.offset_ms);
}

#[tokio::test]
async fn pause_then_start_keeps_elapsed_time() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    client.state.create_timer(None, 60_000).await.unwrap();

    room.clock.advance(12_500);
    let before = client.state.reconciler.read_all().await.unwrap()[0].elapsed(room.clock.now_ms());
    client.state.pause_timers(&Scope::All).await.unwrap();

    room.clock.advance(30_000);
    let timers = client.state.start_timers(&Scope::All).await.unwrap();
    assert_eq!(timers[0].elapsed(room.clock.now_ms()), before);
    assert_eq!(before, 12_500);
}

#[tokio::test]
async fn owner_scope_only_touches_that_owner() {
    let room = Room::new();
    let aria = room.join("p1", "Aria");
    let bram = room.join("p2", "Bram");
    aria.state.create_timer(None, 60_000).await.unwrap();
    bram.state.create_timer(None, 60_000).await.unwrap();

    let timers = aria.state.pause_timers(&Scope::Owner("p1".into())).await.unwrap();
    let now = room.clock.now_ms();
    for timer in timers {
        assert_eq!(timer.is_running(now), timer.owner_id.as_deref() == Some("p2"));
    }
}

#[tokio::test]
async fn writes_backfill_ids_and_owner_labels() {
    let room = Room::new();
    let mut patch = Metadata::new();
    patch.insert(DEFAULT_STORE_KEY.to_string(), json!({ "durationMs": 5000, "startAt": 1 }));
    room.store.set(patch).await.unwrap();

    let client = room.join("p1", "Aria");
    let first = client.state.reconciler.read_all().await.unwrap();
    let second = client.state.reconciler.read_all().await.unwrap();
    assert_eq!(first[0].id, second[0].id);

    let written = client.state.reconciler.write_with(|timers| timers).await.unwrap();
    assert_eq!(written[0].id, first[0].id);
    assert_eq!(written[0].owner_name.as_deref(), Some("Unknown"));

    let raw = room.store.get().await.unwrap();
    assert!(raw[DEFAULT_STORE_KEY].is_array());
}

#[tokio::test]
async fn grouping_prefers_live_roster_names() {
    let room = Room::new();
    room.roster.replace(vec![Participant::new("p1", "Aria the Bold")]);
    let aria = room.join("p1", "Aria");
    let bram = room.join("p2", "Bram");
    aria.state.create_timer(Some("Torch".into()), 60_000).await.unwrap();
    bram.state.create_timer(Some("Candle".into()), 60_000).await.unwrap();
    aria.state.create_timer(Some("Spell".into()), 60_000).await.unwrap();

    let groups = bram.state.grouped_timers().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "Aria the Bold");
    assert_eq!(groups[0].timers.len(), 2);
    assert_eq!(groups[1].name, "Bram");
}

#[tokio::test]
async fn applied_roster_renames_owner_groups() {
    let room = Room::new();
    let aria = room.join("p1", "Aria");
    aria.state.create_timer(Some("Torch".into()), 60_000).await.unwrap();
    assert_eq!(aria.state.grouped_timers().await.unwrap()[0].name, "Aria");

    aria.state.apply_roster(vec![Participant::new("p1", "Aria the Bold")]);
    assert_eq!(aria.state.grouped_timers().await.unwrap()[0].name, "Aria the Bold");

    aria.state.apply_roster(Vec::new());
    assert_eq!(aria.state.grouped_timers().await.unwrap()[0].name, "Aria");
}

#[tokio::test]
async fn roster_changes_reach_grouping_through_background_tasks() {
    let room = Room::new();
    let bram = room.join("p2", "Bram");
    let aria = room.join("p1", "Aria");
    aria.state.create_timer(Some("Torch".into()), 60_000).await.unwrap();
    let mut tasks = spawn_all(bram.state.clone(), Duration::from_millis(10));
    assert_eq!(bram.state.grouped_timers().await.unwrap()[0].name, "Aria");

    room.roster.replace(vec![Participant::new("p1", "Aria the Bold")]);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while bram.state.grouped_timers().await.unwrap()[0].name != "Aria the Bold" {
        assert!(tokio::time::Instant::now() < deadline, "roster change was not applied in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tasks.shutdown().await;
}

#[tokio::test]
async fn conditional_write_retries_after_concurrent_change() {
    let store = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let reconciler = reconciler(store.clone(), clock.clone());

    let sneaky = Timer::new(Some("Sneaky".into()), 5_000, 0);
    let mut raced = false;
    let written = reconciler
        .write_with(|mut timers| {
            if !raced {
                raced = true;
                // Another client writes between our read and our write
                let mut patch = Metadata::new();
                patch.insert(DEFAULT_STORE_KEY.to_string(), json!([sneaky]));
                futures::executor::block_on(store.set(patch)).unwrap();
            }
            timers.push(Timer::new(Some("Mine".into()), 5_000, 0));
            timers
        })
        .await
        .unwrap();

    let names: Vec<_> = written.iter().map(|t| t.display_name().to_string()).collect();
    assert_eq!(names, vec!["Sneaky", "Mine"]);
    assert_eq!(reconciler.read_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn conditional_write_gives_up_eventually() {
    let store = Arc::new(MemoryBlobStore::new());
    let reconciler = reconciler(store.clone(), Arc::new(ManualClock::new(0))).with_max_attempts(3);

    let result = reconciler
        .write_with(|timers| {
            futures::executor::block_on(store.set(Metadata::new())).unwrap();
            timers
        })
        .await;
    assert!(matches!(result, Err(TimerError::Conflict { attempts: 3 })));
}

#[tokio::test]
async fn last_writer_wins_store_overwrites() {
    let store = Arc::new(MemoryBlobStore::last_writer_wins());
    let reconciler = reconciler(store.clone(), Arc::new(ManualClock::new(0)));

    let mut raced = false;
    let written = reconciler
        .write_with(|mut timers| {
            if !raced {
                raced = true;
                let mut patch = Metadata::new();
                patch.insert(DEFAULT_STORE_KEY.to_string(), json!([{ "id": "lost", "durationMs": 1000 }]));
                futures::executor::block_on(store.set(patch)).unwrap();
            }
            timers.push(Timer::new(None, 5_000, 0));
            timers
        })
        .await
        .unwrap();

    // The concurrent write is lost; that is the documented trade-off
    assert_eq!(written.len(), 1);
    assert!(reconciler.read_all().await.unwrap().iter().all(|t| t.id != "lost"));
}

#[tokio::test]
async fn failed_store_write_is_reported() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    room.store.set_fail_writes(true);

    let result = client.state.create_timer(None, 5_000).await;
    assert!(matches!(result, Err(TimerError::Store(_))));
}
