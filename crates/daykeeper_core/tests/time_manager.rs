use chrono::{DateTime, Local, TimeDelta, TimeZone};
use daykeeper_core::{
    start_of_day, Clock, ManualClock, MemoryTimestampStore, ScenePhase, SqliteTimestampStore,
    TimeManager, TimerSettings, TimestampStore, COUNTDOWN_ENDPOINT_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::timeout;

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

fn manager_with(
    clock: &Arc<ManualClock>,
    store: Arc<dyn TimestampStore>,
) -> TimeManager {
    TimeManager::start(
        Handle::current(),
        clock.clone(),
        store,
        TimerSettings::default(),
    )
}

fn memory_manager(clock: &Arc<ManualClock>) -> TimeManager {
    manager_with(clock, Arc::new(MemoryTimestampStore::new()))
}

#[tokio::test(start_paused = true)]
async fn start_sets_current_day_to_start_of_today() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 14, 20, 5)));
    let manager = memory_manager(&clock);

    assert_eq!(manager.current_day(), local(2025, 6, 15, 0, 0, 0));
    assert!(!manager.is_live_timer_running());
}

#[tokio::test(start_paused = true)]
async fn remaining_is_zero_without_persisted_endpoint() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let manager = memory_manager(&clock);

    assert_eq!(manager.remaining_time_since_start(), Duration::ZERO);
    assert!(manager.countdown_endpoint().is_none());
}

#[tokio::test(start_paused = true)]
async fn day_rolls_over_once_at_midnight() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 23, 59, 58)));
    let manager = memory_manager(&clock);
    let mut days = manager.subscribe_day_changes();

    let next = timeout(Duration::from_secs(5), days.recv())
        .await
        .expect("rollover should fire at midnight")
        .unwrap();
    assert_eq!(next, local(2025, 6, 16, 0, 0, 0));
    assert_eq!(next, start_of_day(&clock.now()));
    assert_eq!(manager.current_day(), next);

    let extra = timeout(Duration::from_secs(23 * 3600), days.recv()).await;
    assert!(extra.is_err(), "no second event before the next midnight");
}

#[tokio::test(start_paused = true)]
async fn consecutive_midnights_each_fire_once() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 23, 0, 0)));
    let manager = memory_manager(&clock);
    let mut days = manager.subscribe_day_changes();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let day = timeout(Duration::from_secs(25 * 3600), days.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(day);
    }

    assert_eq!(
        seen,
        vec![
            local(2025, 6, 16, 0, 0, 0),
            local(2025, 6, 17, 0, 0, 0),
            local(2025, 6, 18, 0, 0, 0),
        ]
    );
    drop(manager);
}

#[tokio::test(start_paused = true)]
async fn boundaries_missed_while_suspended_coalesce_into_one_catch_up() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 20, 0, 0)));
    let manager = memory_manager(&clock);
    let mut days = manager.subscribe_day_changes();
    // Let the rollover loop arm its wake-up before the jump.
    tokio::task::yield_now().await;

    // Wall clock runs ahead of the monotonic clock, as after a device sleep.
    clock.advance(TimeDelta::days(2) + TimeDelta::hours(3));

    let caught_up = timeout(Duration::from_secs(5 * 3600), days.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(caught_up, local(2025, 6, 18, 0, 0, 0));
    assert_eq!(manager.current_day(), caught_up);

    let extra = timeout(Duration::from_secs(20 * 3600), days.recv()).await;
    assert!(extra.is_err(), "skipped days must not be replayed");
}

#[tokio::test(start_paused = true)]
async fn early_fire_after_clock_moved_back_reschedules_without_event() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 23, 59, 58)));
    let manager = memory_manager(&clock);
    let mut days = manager.subscribe_day_changes();
    tokio::task::yield_now().await;

    clock.advance(TimeDelta::hours(-1));

    let first = timeout(Duration::from_secs(2 * 3600), days.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, local(2025, 6, 16, 0, 0, 0));
    assert!(days.try_next().is_none());
    drop(manager);
}

#[tokio::test(start_paused = true)]
async fn foreground_refresh_publishes_catch_up_immediately() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 20, 0, 0)));
    let mut manager = memory_manager(&clock);
    let mut days = manager.subscribe_day_changes();

    clock.advance(TimeDelta::days(1));
    manager.handle_scene_phase(ScenePhase::Active);

    assert_eq!(days.try_next(), Some(local(2025, 6, 16, 0, 0, 0)));
    assert_eq!(manager.current_day(), local(2025, 6, 16, 0, 0, 0));

    // A second refresh on the same day is silent.
    assert_eq!(manager.refresh_day(), None);
    assert!(days.try_next().is_none());
}

#[tokio::test(start_paused = true)]
async fn start_countdown_persists_absolute_endpoint() {
    let start = local(2025, 6, 15, 10, 0, 0);
    let clock = Arc::new(ManualClock::starting_at(start));
    let store = Arc::new(MemoryTimestampStore::new());
    let mut manager = manager_with(&clock, store.clone());

    manager.start_countdown(Duration::from_secs(90));

    let endpoint = store.get(COUNTDOWN_ENDPOINT_KEY).unwrap().unwrap();
    assert_eq!(endpoint, start + TimeDelta::seconds(90));
    assert_eq!(manager.countdown_endpoint(), Some(endpoint));
    assert_eq!(manager.remaining_time_since_start(), Duration::from_secs(90));
    assert!(manager.is_live_timer_running());
}

#[tokio::test(start_paused = true)]
async fn remaining_is_non_increasing_and_clamps_at_zero() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);
    manager.start_countdown(Duration::from_secs(3));

    let mut previous = manager.remaining_time_since_start();
    for _ in 0..10 {
        tokio::time::advance(Duration::from_millis(700)).await;
        let current = manager.remaining_time_since_start();
        assert!(current <= previous);
        previous = current;
    }
    assert_eq!(previous, Duration::ZERO);

    // The expired endpoint stays in storage.
    assert!(manager.countdown_endpoint().is_some());
}

#[tokio::test(start_paused = true)]
async fn live_ticks_count_down_and_stop_at_zero() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);
    let mut ticks = manager.subscribe_remaining();

    manager.start_countdown(Duration::from_secs(3));

    let mut seen = Vec::new();
    loop {
        let remaining = timeout(Duration::from_secs(5), ticks.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(remaining.as_secs());
        if remaining.is_zero() {
            break;
        }
    }
    assert_eq!(seen, vec![3, 2, 1, 0]);

    let after = timeout(Duration::from_secs(10), ticks.recv()).await;
    assert!(after.is_err(), "ticks must stop after reaching zero");
    tokio::task::yield_now().await;
    assert!(!manager.is_live_timer_running());
}

#[tokio::test(start_paused = true)]
async fn zero_duration_countdown_is_already_expired() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);
    let mut ticks = manager.subscribe_remaining();

    manager.start_countdown(Duration::ZERO);

    assert_eq!(manager.remaining_time_since_start(), Duration::ZERO);
    let only = timeout(Duration::from_secs(2), ticks.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(only, Duration::ZERO);
    assert!(timeout(Duration::from_secs(5), ticks.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn stop_live_timer_is_idempotent() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);
    manager.start_countdown(Duration::from_secs(60));
    let mut ticks = manager.subscribe_remaining();

    manager.stop_live_timer();
    manager.stop_live_timer();

    assert!(!manager.is_live_timer_running());
    assert!(timeout(Duration::from_secs(5), ticks.recv()).await.is_err());
    // Stopping the display does not touch the countdown itself.
    assert_eq!(manager.remaining_time_since_start(), Duration::from_secs(55));
}

#[tokio::test(start_paused = true)]
async fn background_then_foreground_continues_the_same_countdown() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);
    manager.start_countdown(Duration::from_secs(120));

    manager.handle_scene_phase(ScenePhase::Background);
    assert!(!manager.is_live_timer_running());

    // Suspended for 30 seconds of wall time.
    clock.advance(TimeDelta::seconds(30));
    let mut ticks = manager.subscribe_remaining();
    manager.handle_scene_phase(ScenePhase::Active);
    assert!(manager.is_live_timer_running());

    let resumed = timeout(Duration::from_secs(2), ticks.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resumed, Duration::from_secs(90));
}

#[tokio::test(start_paused = true)]
async fn foreground_without_countdown_does_not_start_ticks() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let mut manager = memory_manager(&clock);

    manager.handle_scene_phase(ScenePhase::Active);
    assert!(!manager.is_live_timer_running());
    assert!(!manager.resume_live_timer());

    manager.handle_scene_phase(ScenePhase::Inactive);
    assert!(!manager.is_live_timer_running());
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_persisted_countdown_without_reset() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("daykeeper.db");
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));

    {
        let store = Arc::new(SqliteTimestampStore::open(&db_path).unwrap());
        let mut first = manager_with(&clock, store);
        first.start_countdown(Duration::from_secs(90));
    }

    // Process is gone for 30 seconds.
    clock.advance(TimeDelta::seconds(30));

    let store = Arc::new(SqliteTimestampStore::open(&db_path).unwrap());
    let second = manager_with(&clock, store);
    assert!(second.is_live_timer_running());
    assert_eq!(second.remaining_time_since_start(), Duration::from_secs(60));

    let mut ticks = second.subscribe_remaining();
    let first_tick = timeout(Duration::from_secs(2), ticks.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first_tick, Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn restart_after_expiry_does_not_start_ticks() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 10, 0, 0)));
    let store: Arc<dyn TimestampStore> = Arc::new(MemoryTimestampStore::new());
    {
        let mut first = manager_with(&clock, store.clone());
        first.start_countdown(Duration::from_secs(10));
    }

    clock.advance(TimeDelta::seconds(11));
    let second = manager_with(&clock, store);

    assert!(!second.is_live_timer_running());
    assert_eq!(second.remaining_time_since_start(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn restarting_countdown_replaces_endpoint() {
    let start = local(2025, 6, 15, 10, 0, 0);
    let clock = Arc::new(ManualClock::starting_at(start));
    let mut manager = memory_manager(&clock);

    manager.start_countdown(Duration::from_secs(600));
    tokio::time::advance(Duration::from_secs(100)).await;
    manager.start_countdown(Duration::from_secs(30));

    assert_eq!(manager.remaining_time_since_start(), Duration::from_secs(30));
    assert_eq!(
        manager.countdown_endpoint(),
        Some((start + TimeDelta::seconds(130)).into())
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_rollover_and_ticks_but_keeps_endpoint() {
    let clock = Arc::new(ManualClock::starting_at(local(2025, 6, 15, 23, 59, 0)));
    let store = Arc::new(MemoryTimestampStore::new());
    let mut manager = manager_with(&clock, store.clone());
    let mut days = manager.subscribe_day_changes();
    let mut ticks = manager.subscribe_remaining();
    manager.start_countdown(Duration::from_secs(600));
    assert_eq!(ticks.recv().await, Some(Duration::from_secs(600)));

    manager.shutdown();

    assert!(!manager.is_live_timer_running());
    assert!(timeout(Duration::from_secs(120), days.recv()).await.is_err());
    assert!(ticks.try_next().is_none());
    assert!(store.get(COUNTDOWN_ENDPOINT_KEY).unwrap().is_some());
}

#[test]
fn format_time_matches_display_contract() {
    assert_eq!(TimeManager::format_time(Duration::ZERO), "00:00");
    assert_eq!(TimeManager::format_time(Duration::from_secs(65)), "01:05");
    assert_eq!(TimeManager::format_time(Duration::from_secs(3661)), "01:01:01");
}
