//! Conversion between a minute/second duration and milliseconds.

/// Milliseconds in one minute.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Milliseconds in one second.
pub const MILLIS_PER_SECOND: i64 = 1_000;

/// Durations whose minute component exceeds this are rendered as `H:MM:SS`.
const MAX_CLOCK_MINUTES: i64 = 60;

/// Returns the total milliseconds for the given minutes and seconds.
#[must_use]
pub fn to_millis(minutes: u32, seconds: u32) -> i64 {
    i64::from(minutes) * MILLIS_PER_MINUTE + i64::from(seconds) * MILLIS_PER_SECOND
}

/// Splits milliseconds into whole (minutes, seconds).
///
/// Partial seconds are dropped. Negative values clamp to `(0, 0)`.
#[must_use]
pub fn split_millis(millis: i64) -> (u32, u32) {
    let millis = millis.max(0);
    let minutes = millis / MILLIS_PER_MINUTE;
    let seconds = (millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    (
        u32::try_from(minutes).unwrap_or(u32::MAX),
        seconds as u32,
    )
}

/// Formats remaining milliseconds for display.
///
/// Up to 60 minutes the result is `"MM : SS"` with both parts zero-padded.
/// Longer values use the elapsed-time form `"H:MM:SS"`.
#[must_use]
pub fn format_remaining(millis: i64) -> String {
    let total_seconds = millis.max(0) / MILLIS_PER_SECOND;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes <= MAX_CLOCK_MINUTES {
        format!("{:02} : {:02}", minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", minutes / 60, minutes % 60, seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================
