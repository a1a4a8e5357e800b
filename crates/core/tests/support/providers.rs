//! Stub providers, notifier and renderer

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clout_core::{CommitSource, FollowerProvider, Notifier, PageRenderer, RenderedPage};
use clout_domain::{
    CloutError, FetchFailure, HistoricalSeries, ProviderResult, Result as DomainResult, Snapshot,
};

/// Commit source returning a canned result.
pub struct StubCommitSource {
    result: Mutex<ProviderResult>,
    daily: Mutex<Result<BTreeMap<NaiveDate, u64>, FetchFailure>>,
    delay: Option<Duration>,
    anchors: Mutex<Vec<DateTime<Utc>>>,
    daily_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl StubCommitSource {
    pub fn ok(count: u64) -> Self {
        Self::with_result(Ok(count))
    }

    pub fn failing(failure: FetchFailure) -> Self {
        Self::with_result(Err(failure))
    }

    fn with_result(result: ProviderResult) -> Self {
        Self {
            result: Mutex::new(result),
            daily: Mutex::new(Ok(BTreeMap::new())),
            delay: None,
            anchors: Mutex::new(Vec::new()),
            daily_ranges: Mutex::new(Vec::new()),
        }
    }

    pub fn with_daily(self, daily: BTreeMap<NaiveDate, u64>) -> Self {
        *self.daily.lock().unwrap() = Ok(daily);
        self
    }

    pub fn with_daily_failure(self, failure: FetchFailure) -> Self {
        *self.daily.lock().unwrap() = Err(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, result: ProviderResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn anchors(&self) -> Vec<DateTime<Utc>> {
        self.anchors.lock().unwrap().clone()
    }

    /// `(since, until)` of every daily count request.
    pub fn daily_ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.daily_ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommitSource for StubCommitSource {
    async fn count_commits_since(&self, anchor: DateTime<Utc>) -> ProviderResult {
        self.anchors.lock().unwrap().push(anchor);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().unwrap().clone()
    }

    async fn daily_commit_counts(
        &self,
        since: NaiveDate,
        until: NaiveDate,
        _timezone: Tz,
    ) -> Result<BTreeMap<NaiveDate, u64>, FetchFailure> {
        self.daily_ranges.lock().unwrap().push((since, until));
        self.daily.lock().unwrap().clone()
    }
}

/// Follower provider returning a canned result.
pub struct StubFollowerProvider {
    name: String,
    result: Mutex<ProviderResult>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubFollowerProvider {
    pub fn ok(name: &str, count: u64) -> Self {
        Self::new(name, Ok(count))
    }

    pub fn failing(name: &str, failure: FetchFailure) -> Self {
        Self::new(name, Err(failure))
    }

    fn new(name: &str, result: ProviderResult) -> Self {
        Self { name: name.to_string(), result: Mutex::new(result), delay: None, calls: AtomicUsize::new(0) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, result: ProviderResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FollowerProvider for StubFollowerProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_current_count(&self) -> ProviderResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().unwrap().clone()
    }
}

/// Notifier that records every call.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_failure(&self, context: &str, details: &str) {
        self.calls.lock().unwrap().push((context.to_string(), details.to_string()));
    }
}

/// Renderer producing a small plain-text summary of the series.
#[derive(Default)]
pub struct StubRenderer {
    fail: bool,
    renders: AtomicUsize,
}

impl StubRenderer {
    pub fn failing() -> Self {
        Self { fail: true, renders: AtomicUsize::new(0) }
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PageRenderer for StubRenderer {
    fn render(
        &self,
        series: &HistoricalSeries,
        latest: Option<&Snapshot>,
        _rendered_at: DateTime<Utc>,
    ) -> DomainResult<RenderedPage> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CloutError::Internal("injected render failure".into()));
        }
        let body = format!(
            "entries={} latest={}",
            series.len(),
            latest.map(|s| s.date().to_string()).unwrap_or_default()
        );
        Ok(RenderedPage { body: body.into_bytes(), content_type: "text/html; charset=utf-8".into() })
    }
}
