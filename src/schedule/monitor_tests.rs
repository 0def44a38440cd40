//! Tests for the schedule loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

use super::{Clock, CycleOutcome, Monitor};
use crate::bitbucket::gateway::MockPullRequestSource;
use crate::bitbucket::models::test_support::{pull_request, reviewer};
use crate::error::MonitorError;
use crate::notify::NotifyError;
use crate::notify::test_support::RecordingNotifier;
use crate::persistence::PersistenceError;
use crate::review::{KeywordFilter, StaleDetector};
use crate::schedule::checkpoint::{CheckpointStore, MockCheckpointStore};
use crate::schedule::checkpoint::test_support::InMemoryCheckpointStore;
use crate::telemetry::MonitorEvent;
use crate::telemetry::test_support::RecordingSink;

const INTERVAL_HOURS: u64 = 24;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0)
        .single()
        .expect("valid date")
}

fn interval() -> StdDuration {
    StdDuration::from_secs(INTERVAL_HOURS * 3600)
}

/// A source with one repository holding one unapproved pull request whose
/// last update was `age_days` before `now`.
fn source_with_one_pull_request(now: DateTime<Utc>, age_days: i64) -> MockPullRequestSource {
    let updated = (now - Duration::days(age_days)).timestamp_millis();
    let mut source = MockPullRequestSource::new();
    source
        .expect_open_pull_requests()
        .returning(move |_| Ok(vec![pull_request(1, "Pending").with_updated_at(updated).build()]));
    source
        .expect_participants()
        .returning(|_, _| Ok(vec![reviewer("a", false)]));
    source.expect_comments().returning(|_, _| Ok(Vec::new()));
    source
}

fn monitor(
    source: MockPullRequestSource,
    checkpoint: Arc<dyn CheckpointStore>,
    sink: Arc<RecordingSink>,
) -> Monitor {
    let detector = StaleDetector::new(Arc::new(source), KeywordFilter::default(), 7, sink.clone());
    Monitor::new(
        detector,
        vec!["api".to_owned()],
        checkpoint,
        sink,
        interval(),
    )
    .expect("monitor should build")
}

#[rstest]
#[tokio::test]
async fn first_run_notifies_and_records_checkpoint(now: DateTime<Utc>) {
    let store = Arc::new(InMemoryCheckpointStore::default());
    let sink = Arc::new(RecordingSink::default());
    let email = Arc::new(RecordingNotifier::succeeding("email"));
    let monitor = monitor(source_with_one_pull_request(now, 10), store.clone(), sink.clone())
        .with_notifier(email.clone());

    let outcome = monitor.run_once(now).await.expect("iteration should succeed");

    assert_eq!(
        outcome,
        CycleOutcome::Notified {
            stale: 1,
            failed_channels: Vec::new(),
        }
    );
    assert_eq!(email.delivered().len(), 1);
    assert_eq!(store.current(), Some(now));
    let events = sink.take();
    assert!(events.contains(&MonitorEvent::NotificationSent {
        channel: "email".to_owned(),
        stale_count: 1,
    }));
    assert!(events.contains(&MonitorEvent::CheckpointRecorded { notified_at: now }));
}

#[rstest]
#[case::just_inside_interval(Duration::seconds(1), CycleOutcome::Skipped)]
#[case::just_past_interval(
    Duration::seconds(-1),
    CycleOutcome::Notified { stale: 1, failed_channels: Vec::new() }
)]
#[tokio::test]
async fn checkpoint_gates_the_cycle(
    now: DateTime<Utc>,
    #[case] offset: Duration,
    #[case] expected: CycleOutcome,
) {
    let last = now - Duration::hours(24) + offset;
    let store = Arc::new(InMemoryCheckpointStore::with_value(Some(last)));
    let sink = Arc::new(RecordingSink::default());
    let monitor = monitor(source_with_one_pull_request(now, 10), store, sink);

    let outcome = monitor.run_once(now).await.expect("iteration should succeed");

    assert_eq!(outcome, expected);
}

#[rstest]
#[tokio::test]
async fn skipped_iteration_touches_no_source(now: DateTime<Utc>) {
    let last = now - Duration::hours(1);
    let store = Arc::new(InMemoryCheckpointStore::with_value(Some(last)));
    let sink = Arc::new(RecordingSink::default());
    let mut source = MockPullRequestSource::new();
    source.expect_open_pull_requests().never();
    let monitor = monitor(source, store.clone(), sink.clone());

    let outcome = monitor.run_once(now).await.expect("iteration should succeed");

    assert_eq!(outcome, CycleOutcome::Skipped);
    assert!(store.writes().is_empty());
    assert_eq!(
        sink.take(),
        vec![MonitorEvent::CycleSkipped {
            last_notified: last,
            next_due: last + Duration::hours(24),
        }]
    );
}

#[rstest]
#[tokio::test]
async fn empty_batch_leaves_checkpoint_unchanged(now: DateTime<Utc>) {
    let previous = now - Duration::days(3);
    let store = Arc::new(InMemoryCheckpointStore::with_value(Some(previous)));
    let sink = Arc::new(RecordingSink::default());
    let email = Arc::new(RecordingNotifier::succeeding("email"));
    let monitor = monitor(source_with_one_pull_request(now, 1), store.clone(), sink.clone())
        .with_notifier(email.clone());

    let outcome = monitor.run_once(now).await.expect("iteration should succeed");

    assert_eq!(outcome, CycleOutcome::NothingToNotify);
    assert_eq!(store.current(), Some(previous));
    assert!(store.writes().is_empty());
    assert!(email.delivered().is_empty());
    assert!(sink.snapshot().contains(&MonitorEvent::NothingToNotify));
}

#[rstest]
#[tokio::test]
async fn failing_channel_does_not_block_others_or_checkpoint(now: DateTime<Utc>) {
    let store = Arc::new(InMemoryCheckpointStore::default());
    let sink = Arc::new(RecordingSink::default());
    let email = Arc::new(RecordingNotifier::failing(
        "email",
        NotifyError::Delivery {
            message: "smtp down".to_owned(),
        },
    ));
    let teams = Arc::new(RecordingNotifier::succeeding("teams"));
    let monitor = monitor(source_with_one_pull_request(now, 10), store.clone(), sink.clone())
        .with_notifier(email.clone())
        .with_notifier(teams.clone());

    let outcome = monitor.run_once(now).await.expect("iteration should succeed");

    assert_eq!(
        outcome,
        CycleOutcome::Notified {
            stale: 1,
            failed_channels: vec!["email".to_owned()],
        }
    );
    assert_eq!(email.delivered().len(), 1);
    assert_eq!(teams.delivered().len(), 1);
    assert_eq!(store.current(), Some(now));
    assert!(sink.snapshot().contains(&MonitorEvent::NotificationFailed {
        channel: "email".to_owned(),
        message: "failed to deliver notification: smtp down".to_owned(),
    }));
}

#[rstest]
#[tokio::test]
async fn checkpoint_read_failure_is_fatal(now: DateTime<Utc>) {
    let mut store = MockCheckpointStore::new();
    store.expect_last_notified().returning(|| {
        Err(PersistenceError::Corrupt {
            message: "bad json".to_owned(),
        })
    });
    store.expect_record_notification().never();
    let mut source = MockPullRequestSource::new();
    source.expect_open_pull_requests().never();
    let monitor = monitor(source, Arc::new(store), Arc::new(RecordingSink::default()));

    let error = monitor.run_once(now).await.expect_err("read failure should abort");

    assert_eq!(
        error,
        MonitorError::Checkpoint(PersistenceError::Corrupt {
            message: "bad json".to_owned(),
        })
    );
}

#[rstest]
#[tokio::test]
async fn checkpoint_write_failure_is_fatal(now: DateTime<Utc>) {
    let mut store = MockCheckpointStore::new();
    store.expect_last_notified().returning(|| Ok(None));
    store.expect_record_notification().returning(|_| {
        Err(PersistenceError::WriteFailed {
            message: "read-only".to_owned(),
        })
    });
    let monitor = monitor(
        source_with_one_pull_request(now, 10),
        Arc::new(store),
        Arc::new(RecordingSink::default()),
    );

    let error = monitor.run_once(now).await.expect_err("write failure should abort");

    assert!(matches!(
        error,
        MonitorError::Checkpoint(PersistenceError::WriteFailed { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let mut source = MockPullRequestSource::new();
    source.expect_open_pull_requests().never();
    let mut store = MockCheckpointStore::new();
    store.expect_last_notified().never();
    let monitor = monitor(source, Arc::new(store), Arc::new(RecordingSink::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = monitor.run(cancel).await;

    assert_eq!(result, Ok(()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let store = Arc::new(InMemoryCheckpointStore::default());
    let email = Arc::new(RecordingNotifier::succeeding("email"));
    let monitor = monitor(
        source_with_one_pull_request(Utc::now(), 10),
        store.clone(),
        Arc::new(RecordingSink::default()),
    )
    .with_notifier(email.clone());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { monitor.run(cancel).await }
    });
    tokio::time::sleep(interval() / 2).await;
    cancel.cancel();
    let result = handle.await.expect("monitor task should not panic");

    assert_eq!(result, Ok(()));
    assert_eq!(email.delivered().len(), 1);
    assert_eq!(store.writes().len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn loop_runs_again_after_one_interval(now: DateTime<Utc>) {
    let store = Arc::new(InMemoryCheckpointStore::default());
    let email = Arc::new(RecordingNotifier::succeeding("email"));
    let started = tokio::time::Instant::now();
    let clock: Clock = Arc::new(move || {
        let elapsed = Duration::from_std(started.elapsed()).expect("elapsed fits");
        now + elapsed
    });
    let monitor = monitor(
        source_with_one_pull_request(now, 10),
        store.clone(),
        Arc::new(RecordingSink::default()),
    )
    .with_notifier(email.clone())
    .with_clock(clock);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { monitor.run(cancel).await }
    });
    tokio::time::sleep(interval() + StdDuration::from_secs(60)).await;
    cancel.cancel();
    let result = handle.await.expect("monitor task should not panic");

    assert_eq!(result, Ok(()));
    assert_eq!(email.delivered().len(), 2);
    let writes = store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes.first(), Some(&now));
    let second = *writes.get(1).expect("second write");
    assert!(second >= now + Duration::hours(24), "second write at {second}");
    assert!(second < now + Duration::hours(24) + Duration::minutes(1));
}

#[rstest]
fn zero_interval_is_rejected() {
    let detector = StaleDetector::new(
        Arc::new(MockPullRequestSource::new()),
        KeywordFilter::default(),
        7,
        Arc::new(RecordingSink::default()),
    );

    let result = Monitor::new(
        detector,
        Vec::new(),
        Arc::new(InMemoryCheckpointStore::default()),
        Arc::new(RecordingSink::default()),
        StdDuration::ZERO,
    );

    assert!(matches!(result, Err(MonitorError::Configuration { .. })));
}
