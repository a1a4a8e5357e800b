//! Full tick behaviour against in-memory ports

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use clout_common::{ErrorClassification, FixedClock};
use clout_core::{
    ReconcileError, SeriesKeys, SeriesReconciler, TickError, TickOutcome, TickService, TickSettings,
    SAVE_FAILURE_CONTEXT,
};
use clout_domain::{FetchFailure, FetchFailureKind, HistoricalSeries, MergeEffect, SeriesDocument};
use support::providers::{RecordingNotifier, StubCommitSource, StubFollowerProvider, StubRenderer};
use support::store::MemoryStore;
use support::date;

const PRIMARY: &str = "historical_data.json";
const BACKUP: &str = "historical_data_backup.json";
const PAGE: &str = "index.html";

const E2E_PRIMARY: &str = r#"{
  "schema_version": 1,
  "last_updated": "2024-01-01T20:00:00Z",
  "entries": [
    {"date":"2024-01-01","commit_count":5,"follower_counts":{"x":100},"ratio":0.05}
  ]
}"#;

struct Harness {
    store: MemoryStore,
    notifier: RecordingNotifier,
    renderer: Arc<StubRenderer>,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new(store: MemoryStore) -> Self {
        Self::with_renderer(store, StubRenderer::default())
    }

    fn with_renderer(store: MemoryStore, renderer: StubRenderer) -> Self {
        // 10:30 on 2024-01-02 in Los Angeles
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 2, 18, 30, 0).unwrap()));
        Self { store, notifier: RecordingNotifier::default(), renderer: Arc::new(renderer), clock }
    }

    fn settings(&self) -> TickSettings {
        TickSettings {
            provider_timeout: Duration::from_millis(200),
            timezone: chrono_tz::America::Los_Angeles,
            commit_anchor_year: None,
            page_key: PAGE.into(),
        }
    }

    fn service(&self, commits: Arc<StubCommitSource>) -> TickService {
        self.service_with(commits, self.settings())
    }

    fn service_with(&self, commits: Arc<StubCommitSource>, settings: TickSettings) -> TickService {
        let reconciler = SeriesReconciler::new(
            Arc::new(self.store.clone()),
            SeriesKeys::new(PRIMARY, BACKUP, "backups/historical_data"),
            self.clock.clone(),
        );
        TickService::new(
            reconciler,
            commits,
            Arc::new(self.notifier.clone()),
            self.clock.clone(),
            settings,
        )
        .with_renderer(self.renderer.clone())
    }

    fn series(&self) -> HistoricalSeries {
        SeriesDocument::parse(&self.store.object(PRIMARY).unwrap()).unwrap().into_series()
    }
}

#[tokio::test]
async fn tick_merges_second_day_and_publishes() {
    let harness = Harness::new(MemoryStore::new().with_object(PRIMARY, E2E_PRIMARY));
    let service = harness
        .service(Arc::new(StubCommitSource::ok(8)))
        .with_provider(Arc::new(StubFollowerProvider::ok("x", 110)));

    let report = service.run_tick().await.unwrap();

    assert_eq!(report.date, date(2024, 1, 2));
    assert!(report.page_published);
    match &report.outcome {
        TickOutcome::Recorded { snapshot, effect, .. } => {
            assert_eq!(*effect, MergeEffect::Inserted);
            assert!((snapshot.ratio().unwrap() - 8.0 / 110.0).abs() < 1e-12);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let series = harness.series();
    assert_eq!(series.len(), 2);
    assert_eq!(series.latest().unwrap().follower_count("x"), Some(110));
    assert_eq!(harness.store.object(PAGE).unwrap(), b"entries=2 latest=2024-01-02");
    assert_eq!(harness.store.content_type(PAGE).as_deref(), Some("text/html; charset=utf-8"));
    assert!(harness.notifier.calls().is_empty());
}

#[tokio::test]
async fn repeated_tick_keeps_one_entry_per_date() {
    let harness = Harness::new(MemoryStore::new());
    let service = harness
        .service(Arc::new(StubCommitSource::ok(8)))
        .with_provider(Arc::new(StubFollowerProvider::ok("twitter", 110)));

    service.run_tick().await.unwrap();
    let second = service.run_tick().await.unwrap();

    assert!(matches!(second.outcome, TickOutcome::Recorded { effect: MergeEffect::Unchanged, .. }));
    assert_eq!(harness.series().len(), 1);
}

#[tokio::test]
async fn primary_write_failure_notifies_once_and_preserves_state() {
    let store = MemoryStore::new()
        .with_object(PRIMARY, E2E_PRIMARY)
        .with_object(BACKUP, E2E_PRIMARY)
        .with_object(PAGE, "old page");
    store.fail_put(PRIMARY);
    let harness = Harness::new(store);
    let before = harness.store.dump();
    let service = harness
        .service(Arc::new(StubCommitSource::ok(8)))
        .with_provider(Arc::new(StubFollowerProvider::ok("x", 110)));

    let err = service.run_tick().await.unwrap_err();

    assert!(matches!(err, TickError::Reconcile(_)));
    assert!(err.is_critical());
    assert_eq!(harness.store.dump(), before);
    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, SAVE_FAILURE_CONTEXT);
    assert!(calls[0].1.contains(PRIMARY));
    assert_eq!(harness.renderer.renders(), 0);
}

#[tokio::test]
async fn failed_provider_is_omitted() {
    let harness = Harness::new(MemoryStore::new());
    let service = harness
        .service(Arc::new(StubCommitSource::ok(30)))
        .with_provider(Arc::new(StubFollowerProvider::ok("twitter", 10)))
        .with_provider(Arc::new(StubFollowerProvider::failing(
            "youtube",
            FetchFailure::rate_limited("quota exceeded"),
        )));

    let report = service.run_tick().await.unwrap();

    assert_eq!(report.provider_failures.len(), 1);
    assert_eq!(report.provider_failures["youtube"].kind, FetchFailureKind::RateLimited);
    let latest = harness.series().latest().cloned().unwrap();
    assert_eq!(latest.follower_count("youtube"), None);
    assert_eq!(latest.ratio(), Some(3.0));
}

#[tokio::test]
async fn slow_provider_times_out_without_blocking_others() {
    let harness = Harness::new(MemoryStore::new());
    let service = harness
        .service(Arc::new(StubCommitSource::ok(12)))
        .with_provider(Arc::new(StubFollowerProvider::ok("twitter", 4)))
        .with_provider(Arc::new(
            StubFollowerProvider::ok("bluesky", 1_000).with_delay(Duration::from_secs(30)),
        ));

    let started = std::time::Instant::now();
    let report = service.run_tick().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.provider_failures["bluesky"].kind, FetchFailureKind::Transport);
    let latest = harness.series().latest().cloned().unwrap();
    assert_eq!(latest.follower_counts(), &BTreeMap::from([("twitter".to_string(), 4)]));
}

#[tokio::test]
async fn commit_failure_skips_without_notifying() {
    let harness = Harness::new(MemoryStore::new().with_object(PRIMARY, E2E_PRIMARY));
    let before = harness.store.object(PRIMARY);
    let service = harness
        .service(Arc::new(StubCommitSource::failing(FetchFailure::auth("bad credentials"))))
        .with_provider(Arc::new(StubFollowerProvider::ok("x", 110)));

    let report = service.run_tick().await.unwrap();

    assert!(matches!(
        report.outcome,
        TickOutcome::Skipped { ref reason } if reason.kind == FetchFailureKind::Auth
    ));
    assert!(!report.is_recorded());
    assert_eq!(harness.store.object(PRIMARY), before);
    assert!(harness.notifier.calls().is_empty());
    assert!(report.page_published);
    assert_eq!(harness.store.object(PAGE).unwrap(), b"entries=1 latest=2024-01-01");
}

#[tokio::test]
async fn render_failure_does_not_fail_tick() {
    let harness = Harness::with_renderer(MemoryStore::new(), StubRenderer::failing());
    let service = harness.service(Arc::new(StubCommitSource::ok(1)));

    let report = service.run_tick().await.unwrap();

    assert!(report.is_recorded());
    assert!(!report.page_published);
    assert!(harness.store.object(PAGE).is_none());
    assert!(harness.store.object(PRIMARY).is_some());
}

#[tokio::test]
async fn page_write_failure_does_not_fail_tick() {
    let store = MemoryStore::new();
    store.fail_put(PAGE);
    let harness = Harness::new(store);

    let report = harness.service(Arc::new(StubCommitSource::ok(1))).run_tick().await.unwrap();

    assert!(report.is_recorded());
    assert!(!report.page_published);
    assert!(harness.notifier.calls().is_empty());
}

#[tokio::test]
async fn commit_anchor_is_january_first_in_dashboard_zone() {
    let harness = Harness::new(MemoryStore::new());
    let commits = Arc::new(StubCommitSource::ok(1));
    let service = harness.service(commits.clone());

    let report = service.run_tick().await.unwrap();

    let expected = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    assert_eq!(report.anchor, expected);
    assert_eq!(commits.anchors(), vec![expected]);
}

#[tokio::test]
async fn configured_anchor_year_is_used() {
    let harness = Harness::new(MemoryStore::new());
    let commits = Arc::new(StubCommitSource::ok(1));
    let mut settings = harness.settings();
    settings.commit_anchor_year = Some(2023);

    harness.service_with(commits.clone(), settings).run_tick().await.unwrap();

    assert_eq!(commits.anchors(), vec![Utc.with_ymd_and_hms(2023, 1, 1, 8, 0, 0).unwrap()]);
}

#[tokio::test]
async fn tick_date_follows_dashboard_timezone() {
    let harness = Harness::new(MemoryStore::new());
    // 02:00 UTC on Jan 3 is still Jan 2 in Los Angeles
    harness.clock.set(Utc.with_ymd_and_hms(2024, 1, 3, 2, 0, 0).unwrap());

    let report = harness.service(Arc::new(StubCommitSource::ok(1))).run_tick().await.unwrap();

    assert_eq!(report.date, date(2024, 1, 2));
}

#[tokio::test]
async fn backfill_builds_cumulative_history_in_one_save() {
    let harness = Harness::new(MemoryStore::new().with_object(PRIMARY, E2E_PRIMARY));
    let daily = BTreeMap::from([(date(2024, 1, 1), 2), (date(2024, 1, 2), 3)]);
    let service = harness.service(Arc::new(StubCommitSource::ok(0).with_daily(daily)));
    let followers = BTreeMap::from([("twitter".to_string(), 35)]);

    let report = service.backfill(date(2024, 1, 1), None, &followers).await.unwrap();

    assert_eq!(report.until, date(2024, 1, 2));
    assert_eq!((report.inserted, report.replaced, report.unchanged), (1, 1, 0));
    assert_eq!(report.planned(), 2);
    let series = harness.series();
    let counts: Vec<u64> = series.iter().map(|s| s.commit_count()).collect();
    assert_eq!(counts, vec![2, 5]);
    assert_eq!(series.entries()[0].follower_count("x"), None);
    assert_eq!(harness.store.put_attempts().iter().filter(|k| *k == PRIMARY).count(), 1);
}

#[tokio::test]
async fn backfill_rejects_inverted_range() {
    let harness = Harness::new(MemoryStore::new());
    let service = harness.service(Arc::new(StubCommitSource::ok(0)));

    let err = service
        .backfill(date(2024, 2, 1), Some(date(2024, 1, 1)), &BTreeMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TickError::InvalidRange { .. }));
    assert!(harness.store.put_attempts().is_empty());
}

#[tokio::test]
async fn backfill_fetch_failure_writes_nothing() {
    let harness = Harness::new(MemoryStore::new());
    let commits =
        StubCommitSource::ok(0).with_daily_failure(FetchFailure::transport("connection reset"));
    let service = harness.service(Arc::new(commits));

    let err = service.backfill(date(2024, 1, 1), None, &BTreeMap::new()).await.unwrap_err();

    assert!(matches!(err, TickError::Backfill(_)));
    assert!(err.is_retryable());
    assert!(harness.store.put_attempts().is_empty());
}

#[tokio::test]
async fn unreadable_store_notifies_and_keeps_history() {
    let store = MemoryStore::new().with_object(PRIMARY, E2E_PRIMARY).with_object(BACKUP, E2E_PRIMARY);
    store.fail_get(PRIMARY);
    store.fail_get(BACKUP);
    let harness = Harness::new(store);
    let before = harness.store.dump();
    let service = harness.service(Arc::new(StubCommitSource::ok(8)));

    let err = service.run_tick().await.unwrap_err();

    assert!(matches!(err, TickError::Reconcile(ReconcileError::Unavailable { .. })));
    assert!(err.is_critical());
    assert_eq!(harness.store.dump(), before);
    assert!(harness.store.put_attempts().is_empty());
    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, SAVE_FAILURE_CONTEXT);
}

#[tokio::test]
async fn mid_year_backfill_fetches_from_january_first() {
    let harness = Harness::new(MemoryStore::new());
    let daily = BTreeMap::from([
        (date(2024, 1, 10), 20),
        (date(2024, 5, 31), 2),
        (date(2024, 6, 1), 3),
    ]);
    let commits = Arc::new(StubCommitSource::ok(0).with_daily(daily));
    let service = harness.service(commits.clone());

    let report = service
        .backfill(date(2024, 6, 1), Some(date(2024, 6, 2)), &BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(report.planned(), 2);
    assert_eq!(commits.daily_ranges(), vec![(date(2024, 1, 1), date(2024, 6, 2))]);
    let counts: Vec<u64> = harness.series().iter().map(|s| s.commit_count()).collect();
    assert_eq!(counts, vec![25, 25]);
}

#[tokio::test]
async fn backfill_across_new_year_restarts_the_count() {
    let harness = Harness::new(MemoryStore::new());
    let daily = BTreeMap::from([(date(2024, 12, 31), 6), (date(2025, 1, 1), 1)]);
    let service = harness.service(Arc::new(StubCommitSource::ok(0).with_daily(daily)));

    service
        .backfill(date(2024, 12, 31), Some(date(2025, 1, 1)), &BTreeMap::new())
        .await
        .unwrap();

    let series = harness.series();
    assert_eq!(series.get(date(2024, 12, 31)).map(|s| s.commit_count()), Some(6));
    assert_eq!(series.get(date(2025, 1, 1)).map(|s| s.commit_count()), Some(1));
}

#[tokio::test]
async fn backfill_primary_write_failure_notifies_once() {
    let store = MemoryStore::new().with_object(PRIMARY, E2E_PRIMARY);
    store.fail_put(PRIMARY);
    let harness = Harness::new(store);
    let before = harness.store.dump();
    let daily = BTreeMap::from([(date(2024, 1, 2), 3)]);
    let service = harness.service(Arc::new(StubCommitSource::ok(0).with_daily(daily)));

    let err = service.backfill(date(2024, 1, 1), None, &BTreeMap::new()).await.unwrap_err();

    assert!(matches!(err, TickError::Reconcile(ReconcileError::PrimaryWrite { .. })));
    assert_eq!(harness.store.dump(), before);
    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, SAVE_FAILURE_CONTEXT);
    assert!(calls[0].1.contains(PRIMARY));
}

#[tokio::test]
async fn backfill_quarantines_corrupt_primary_after_saving() {
    let store = MemoryStore::new().with_object(PRIMARY, "{ not json").with_object(BACKUP, E2E_PRIMARY);
    let harness = Harness::new(store);
    let daily = BTreeMap::from([(date(2024, 1, 2), 3)]);
    let service = harness.service(Arc::new(StubCommitSource::ok(0).with_daily(daily)));

    service.backfill(date(2024, 1, 2), None, &BTreeMap::new()).await.unwrap();

    let quarantined = format!("{PRIMARY}.corrupt_20240102_183000");
    assert_eq!(harness.store.object(&quarantined).unwrap(), b"{ not json");
    let attempts = harness.store.put_attempts();
    let primary_at = attempts.iter().position(|k| k == PRIMARY).unwrap();
    let quarantine_at = attempts.iter().position(|k| *k == quarantined).unwrap();
    assert!(primary_at < quarantine_at);
    assert_eq!(harness.series().len(), 2);
}

#[tokio::test]
async fn republish_renders_stored_series() {
    let harness = Harness::new(MemoryStore::new().with_object(BACKUP, E2E_PRIMARY));
    let service = harness.service(Arc::new(StubCommitSource::ok(0)));

    let source = service.republish().await.unwrap();

    assert_eq!(source, clout_core::SeriesSource::Backup);
    assert_eq!(harness.store.object(PAGE).unwrap(), b"entries=1 latest=2024-01-01");
    assert!(harness.store.object(PRIMARY).is_none());
}
