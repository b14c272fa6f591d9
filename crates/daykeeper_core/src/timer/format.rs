//! Countdown display formatting.

use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;

/// Formats a remaining duration for display.
///
/// Returns `HH:MM:SS` from one hour upwards and `MM:SS` below it. Sub-second
/// remainders are truncated, never rounded, so a countdown shows `00:00`
/// only once it has actually reached zero.
pub fn format_time(interval: Duration) -> String {
    let total = interval.as_secs();
    let hours = total / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
