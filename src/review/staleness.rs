//! Staleness classification.

use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days elapsed between `last_activity` and `now`, rounded down.
///
/// Activity in the future yields a negative count.
#[must_use]
pub fn elapsed_days(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_activity)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_DAY)
}

/// Returns `true` when at least `threshold_days` whole days have elapsed.
#[must_use]
pub fn is_stale(last_activity: DateTime<Utc>, now: DateTime<Utc>, threshold_days: i64) -> bool {
    elapsed_days(last_activity, now) >= threshold_days
}
