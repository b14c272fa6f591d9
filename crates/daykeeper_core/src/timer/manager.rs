//! Day-rollover and persistent countdown coordinator.
//!
//! # Responsibility
//! - Track the local calendar day in effect and announce each change.
//! - Persist the countdown endpoint and publish live remaining-time ticks.
//! - React to host lifecycle transitions (resume/pause live ticks, re-check
//!   the day after a suspension).
//!
//! # Invariants
//! - The rollover wake-up is always computed from the wall clock
//!   (`next_day_start(current_day) - now`) and re-armed after every fire.
//!   A fire re-derives the day from `now`, so missed boundaries coalesce
//!   into one event carrying the true current day.
//! - A day change is published at most once per boundary: the compare and
//!   update of the current day is a single `send_if_modified`.
//! - The countdown endpoint is an absolute timestamp in the store. Live ticks
//!   only ever read it, so stopping or restarting them loses nothing.
//! - Store failures never escape; an unreadable endpoint reads as "no
//!   countdown".

use crate::clock::{next_day_start, start_of_day, Clock, DayStart};
use crate::repo::timestamp_store::TimestampStore;
use crate::timer::format;
use crate::timer::lifecycle::ScenePhase;
use crate::timer::subscription::Subscription;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Store key of the single countdown slot.
pub const COUNTDOWN_ENDPOINT_KEY: &str = "countdown_endpoint";

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Coordinator tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    /// Cadence of live remaining-time ticks.
    pub tick_interval: Duration,
    /// Per-stream buffer before slow subscribers start skipping events.
    pub channel_capacity: usize,
    /// Store key holding the countdown endpoint.
    pub countdown_key: String,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            countdown_key: COUNTDOWN_ENDPOINT_KEY.to_string(),
        }
    }
}

/// A spawned wake-up loop and the means to stop it.
struct ScheduledTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    fn spawn<F>(runtime: &Handle, job: impl FnOnce(CancellationToken) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(job(cancel.clone()));
        Self { cancel, handle }
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// State shared between the coordinator and its spawned loops.
#[derive(Clone)]
struct Shared {
    clock: Arc<dyn Clock>,
    store: Arc<dyn TimestampStore>,
    countdown_key: Arc<str>,
    current_day: Arc<watch::Sender<DayStart>>,
    day_tx: broadcast::Sender<DayStart>,
    remaining_tx: broadcast::Sender<Duration>,
}

impl Shared {
    fn endpoint(&self) -> Option<DateTime<Utc>> {
        match self.store.get(&self.countdown_key) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(
                    "event=store_read module=timer status=error key={} error={err}",
                    self.countdown_key
                );
                None
            }
        }
    }

    fn remaining(&self) -> Duration {
        match self.endpoint() {
            Some(endpoint) => remaining_until(endpoint, self.clock.now().with_timezone(&Utc)),
            None => Duration::ZERO,
        }
    }

    /// Re-derives the day from the wall clock and publishes it if it moved.
    fn apply_day_change(&self, trigger: &'static str) -> Option<DayStart> {
        let today = start_of_day(&self.clock.now());
        let changed = self.current_day.send_if_modified(|day| {
            if *day == today {
                return false;
            }
            *day = today;
            true
        });
        if !changed {
            debug!("event=day_check module=timer status=unchanged trigger={trigger} day={today}");
            return None;
        }

        info!("event=day_changed module=timer status=ok trigger={trigger} day={today}");
        // No subscribers is fine; the new day is still readable via `current_day`.
        let _ = self.day_tx.send(today);
        Some(today)
    }
}

fn remaining_until(endpoint: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (endpoint - now).to_std().unwrap_or(Duration::ZERO)
}

async fn run_day_rollover(shared: Shared, cancel: CancellationToken) {
    loop {
        let current_day = *shared.current_day.borrow();
        let next_boundary = next_day_start(&current_day);
        let wait = (next_boundary - shared.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(
            "event=rollover_scheduled module=timer status=ok next={next_boundary} wait_ms={}",
            wait.as_millis()
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
        shared.apply_day_change("timer");
    }
}

async fn run_live_ticks(shared: Shared, tick_interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let remaining = shared.remaining();
                let _ = shared.remaining_tx.send(remaining);
                if remaining.is_zero() {
                    info!("event=countdown_finished module=timer status=ok");
                    break;
                }
            }
        }
    }
}

/// Single authority for "what day is it" and "how much countdown is left".
///
/// Construct exactly one per process at the application root and hand out
/// references. Both wake-up loops run on the runtime passed to
/// [`TimeManager::start`] and are cancelled when the manager is dropped.
pub struct TimeManager {
    shared: Shared,
    runtime: Handle,
    tick_interval: Duration,
    rollover: Option<ScheduledTask>,
    live_timer: Option<ScheduledTask>,
}

impl TimeManager {
    /// Sets the current day, arms the rollover wake-up and resumes live
    /// ticks for a persisted countdown that has time left.
    pub fn start(
        runtime: Handle,
        clock: Arc<dyn Clock>,
        store: Arc<dyn TimestampStore>,
        settings: TimerSettings,
    ) -> Self {
        let today = start_of_day(&clock.now());
        let (current_day, _) = watch::channel(today);
        let capacity = settings.channel_capacity.max(1);
        let (day_tx, _) = broadcast::channel(capacity);
        let (remaining_tx, _) = broadcast::channel(capacity);

        let mut manager = Self {
            shared: Shared {
                clock,
                store,
                countdown_key: Arc::from(settings.countdown_key.as_str()),
                current_day: Arc::new(current_day),
                day_tx,
                remaining_tx,
            },
            runtime,
            tick_interval: settings.tick_interval,
            rollover: None,
            live_timer: None,
        };

        manager.schedule_rollover();
        let remaining = manager.remaining_time_since_start();
        if !remaining.is_zero() {
            manager.start_live_timer();
        }
        info!(
            "event=timer_init module=timer status=ok current_day={today} resumed_countdown={} remaining_ms={}",
            !remaining.is_zero(),
            remaining.as_millis()
        );
        manager
    }

    /// Start of the local day currently in effect.
    pub fn current_day(&self) -> DayStart {
        *self.shared.current_day.borrow()
    }

    /// Subscribes to day changes published from now on.
    pub fn subscribe_day_changes(&self) -> Subscription<DayStart> {
        Subscription::new(self.shared.day_tx.subscribe())
    }

    /// Subscribes to live remaining-time ticks published from now on.
    pub fn subscribe_remaining(&self) -> Subscription<Duration> {
        Subscription::new(self.shared.remaining_tx.subscribe())
    }

    /// Persists `now + duration` as the countdown endpoint and restarts live
    /// ticks. A zero duration persists an already expired countdown.
    pub fn start_countdown(&mut self, duration: Duration) {
        let now = self.shared.clock.now().with_timezone(&Utc);
        let endpoint = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        match self.shared.store.set(&self.shared.countdown_key, endpoint) {
            Ok(()) => info!(
                "event=countdown_started module=timer status=ok duration_ms={} endpoint={endpoint}",
                duration.as_millis()
            ),
            Err(err) => warn!(
                "event=store_write module=timer status=error key={} error={err}",
                self.shared.countdown_key
            ),
        }
        self.start_live_timer();
    }

    /// Time left until the persisted endpoint, clamped at zero.
    pub fn remaining_time_since_start(&self) -> Duration {
        self.shared.remaining()
    }

    /// Persisted countdown endpoint, if any. Expired endpoints are kept.
    pub fn countdown_endpoint(&self) -> Option<DateTime<Utc>> {
        self.shared.endpoint()
    }

    /// Cancels live ticks. No-op when none are running.
    pub fn stop_live_timer(&mut self) {
        if let Some(task) = self.live_timer.take() {
            let was_running = task.is_running();
            task.stop();
            if was_running {
                info!("event=live_timer_stopped module=timer status=ok");
            }
        }
    }

    pub fn is_live_timer_running(&self) -> bool {
        self.live_timer.as_ref().is_some_and(ScheduledTask::is_running)
    }

    /// Restarts live ticks if the persisted countdown still has time left.
    ///
    /// Returns whether ticks are running afterwards.
    pub fn resume_live_timer(&mut self) -> bool {
        if self.is_live_timer_running() {
            return true;
        }
        if self.remaining_time_since_start().is_zero() {
            return false;
        }
        self.start_live_timer();
        true
    }

    /// Re-derives the current day right away and re-arms the rollover.
    ///
    /// Returns the new day when it changed (the change is also published).
    pub fn refresh_day(&mut self) -> Option<DayStart> {
        if let Some(task) = self.rollover.take() {
            task.stop();
        }
        let changed = self.shared.apply_day_change("refresh");
        self.schedule_rollover();
        changed
    }

    /// Lifecycle hook for host foreground/background transitions.
    pub fn handle_scene_phase(&mut self, phase: ScenePhase) {
        debug!("event=scene_phase module=timer phase={}", phase.as_str());
        match phase {
            ScenePhase::Active => {
                self.refresh_day();
                self.resume_live_timer();
            }
            ScenePhase::Background => self.stop_live_timer(),
            ScenePhase::Inactive => {}
        }
    }

    /// Formats a remaining duration as `MM:SS` or `HH:MM:SS`.
    pub fn format_time(interval: Duration) -> String {
        format::format_time(interval)
    }

    /// Cancels both wake-up loops. Persisted state is left untouched.
    pub fn shutdown(&mut self) {
        self.stop_live_timer();
        if let Some(task) = self.rollover.take() {
            task.stop();
        }
    }

    fn schedule_rollover(&mut self) {
        let shared = self.shared.clone();
        self.rollover = Some(ScheduledTask::spawn(&self.runtime, move |cancel| {
            run_day_rollover(shared, cancel)
        }));
    }

    fn start_live_timer(&mut self) {
        self.stop_live_timer();
        let shared = self.shared.clone();
        let tick_interval = self.tick_interval;
        self.live_timer = Some(ScheduledTask::spawn(&self.runtime, move |cancel| {
            run_live_ticks(shared, tick_interval, cancel)
        }));
        info!(
            "event=live_timer_started module=timer status=ok interval_ms={}",
            tick_interval.as_millis()
        );
    }
}

impl Drop for TimeManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
