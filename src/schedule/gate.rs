//! Decides whether a check cycle is due.

use chrono::{DateTime, Duration, Utc};

/// Returns `true` when no notification was ever sent or at least `interval`
/// has passed since the last one.
#[must_use]
pub fn should_run_cycle(
    last_notified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> bool {
    last_notified.is_none_or(|last| now - last >= interval)
}

/// Earliest time a cycle may run after a notification at `last_notified`.
#[must_use]
pub fn next_due(last_notified: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    last_notified
        .checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::{next_due, should_run_cycle};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    #[rstest]
    fn absent_checkpoint_always_runs(now: DateTime<Utc>) {
        assert!(should_run_cycle(None, now, Duration::hours(24)));
        assert!(should_run_cycle(None, now, Duration::days(365)));
    }

    #[rstest]
    #[case::not_yet_elapsed(Duration::seconds(-1), false)]
    #[case::exactly_elapsed(Duration::zero(), true)]
    #[case::elapsed(Duration::seconds(1), true)]
    fn checkpoint_gates_on_interval(
        now: DateTime<Utc>,
        #[case] beyond_interval: Duration,
        #[case] expected: bool,
    ) {
        let interval = Duration::hours(24);
        let last = now - interval - beyond_interval;

        assert_eq!(should_run_cycle(Some(last), now, interval), expected);
    }

    #[rstest]
    fn checkpoint_in_the_future_skips(now: DateTime<Utc>) {
        let last = now + Duration::hours(1);

        assert!(!should_run_cycle(Some(last), now, Duration::hours(24)));
    }

    #[rstest]
    fn next_due_adds_interval(now: DateTime<Utc>) {
        assert_eq!(next_due(now, Duration::hours(24)), now + Duration::days(1));
    }
}
