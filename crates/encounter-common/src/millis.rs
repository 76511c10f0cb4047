//! Millisecond arithmetic over wall-clock timestamps.
//!
//! All durations in the tracker are whole milliseconds held in a `u64`.
//! Timestamps are UTC `chrono` values supplied by the caller.

use chrono::{DateTime, Duration, Utc};

/// Wall-clock timestamp used throughout the tracker.
pub type Timestamp = DateTime<Utc>;

/// Milliseconds from `start` to `end`, clamped at zero when `end` precedes `start`.
#[must_use]
pub fn millis_between(start: Timestamp, end: Timestamp) -> u64 {
    let delta = end.signed_duration_since(start).num_milliseconds();
    u64::try_from(delta).unwrap_or(0)
}

/// Moves `timestamp` forward by `millis`, saturating at chrono's maximum.
#[must_use]
pub fn add_millis(timestamp: Timestamp, millis: u64) -> Timestamp {
    let millis = i64::try_from(millis).unwrap_or(i64::MAX);
    timestamp
        .checked_add_signed(Duration::milliseconds(millis))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Builds a timestamp from milliseconds since the Unix epoch.
///
/// Out-of-range values fall back to the epoch.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Timestamp {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}
