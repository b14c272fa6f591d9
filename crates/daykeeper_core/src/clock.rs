//! Wall-clock access and calendar-day arithmetic.
//!
//! # Responsibility
//! - Abstract "now" behind [`Clock`] so timer code can run in virtual time.
//! - Compute local day boundaries with host calendar semantics.
//!
//! # Invariants
//! - [`start_of_day`] always returns an instant on the same local date.
//! - [`next_day_start`] is strictly later than its input day start.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use std::sync::atomic::{AtomicI64, Ordering};

/// Start-of-day value in local time (time-of-day truncated to midnight).
pub type DayStart = DateTime<Local>;

/// Granularity used to find the first valid instant of a day whose midnight
/// falls into a DST gap.
const DST_GAP_PROBE_MINUTES: i64 = 15;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Host wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Wall clock that follows tokio's clock from a fixed starting point.
///
/// Under `tokio::time::pause()` the wall time advances exactly as far as the
/// runtime auto-advances, which lets day rollovers run in virtual time.
/// [`ManualClock::advance`] moves wall time without moving tokio's clock,
/// which is what a device suspension or a manual clock change looks like
/// from inside the process.
#[derive(Debug)]
pub struct ManualClock {
    base: DateTime<Local>,
    origin: tokio::time::Instant,
    offset_ms: AtomicI64,
}

impl ManualClock {
    pub fn starting_at(base: DateTime<Local>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
            offset_ms: AtomicI64::new(0),
        }
    }

    /// Jumps wall time by `delta` (negative moves the clock backwards).
    pub fn advance(&self, delta: TimeDelta) {
        self.offset_ms
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::zero());
        let offset = TimeDelta::milliseconds(self.offset_ms.load(Ordering::SeqCst));
        self.base + elapsed + offset
    }
}

/// Half-open epoch-millisecond range `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    pub fn contains(&self, epoch_ms: i64) -> bool {
        epoch_ms >= self.start_ms && epoch_ms < self.end_ms
    }
}

/// Returns the first instant of `at`'s calendar date in its own time zone.
///
/// When local midnight does not exist (DST gap), returns the first valid
/// instant of that date. When midnight is ambiguous, returns the earlier one.
pub fn start_of_day<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = at.timezone();
    first_instant_of(&tz, at.date_naive()).unwrap_or_else(|| at.clone())
}

/// Returns the start of the calendar date following `day`.
pub fn next_day_start<Tz: TimeZone>(day: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = day.timezone();
    let date = day.date_naive();
    date.succ_opt()
        .and_then(|next| first_instant_of(&tz, next))
        // Only reachable at the very end of chrono's date range.
        .unwrap_or_else(|| day.clone() + TimeDelta::days(1))
}

/// Returns the half-open epoch-millisecond range covering `day`'s date.
pub fn day_range<Tz: TimeZone>(day: &DateTime<Tz>) -> TimeRange {
    let start = start_of_day(day);
    let end = next_day_start(&start);
    TimeRange {
        start_ms: start.timestamp_millis(),
        end_ms: end.timestamp_millis(),
    }
}

fn first_instant_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(instant) = tz.from_local_datetime(&midnight).earliest() {
        return Some(instant);
    }

    let probes = 24 * 60 / DST_GAP_PROBE_MINUTES;
    (1..probes).find_map(|step| {
        let candidate = midnight + TimeDelta::minutes(step * DST_GAP_PROBE_MINUTES);
        tz.from_local_datetime(&candidate).earliest()
    })
}
