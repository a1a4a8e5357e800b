//! Port interfaces for a dashboard tick
//!
//! These traits define the boundaries between the tick logic and the
//! provider, notification and rendering adapters.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clout_domain::{FetchFailure, HistoricalSeries, ProviderResult, Result, Snapshot};

/// Source of the cumulative commit count
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Commits authored since `anchor` across every visible repository.
    async fn count_commits_since(&self, anchor: DateTime<Utc>) -> ProviderResult;

    /// Per-day commit counts for `since..=until`, bucketed in `timezone`.
    ///
    /// Days without commits may be absent from the map.
    async fn daily_commit_counts(
        &self,
        since: NaiveDate,
        until: NaiveDate,
        timezone: Tz,
    ) -> std::result::Result<BTreeMap<NaiveDate, u64>, FetchFailure>;
}

/// One follower platform
#[async_trait]
pub trait FollowerProvider: Send + Sync {
    /// Stable key used in `follower_counts` (e.g. `twitter`).
    fn name(&self) -> &str;

    async fn fetch_current_count(&self) -> ProviderResult;
}

/// Out-of-band failure alerts
///
/// Implementations swallow their own delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_failure(&self, context: &str, details: &str);
}

/// Rendered dashboard page ready for publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Turns the series into a publishable page
pub trait PageRenderer: Send + Sync {
    /// Render `series`; `latest` is the entry shown in the summary cards.
    ///
    /// # Errors
    /// Returns an error if the page cannot be produced.
    fn render(
        &self,
        series: &HistoricalSeries,
        latest: Option<&Snapshot>,
        rendered_at: DateTime<Utc>,
    ) -> Result<RenderedPage>;
}
