//! One scheduled execution of the dashboard updater

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use clout_common::{Clock, ErrorClassification, ErrorSeverity};
use clout_domain::{
    CloutError, FetchFailure, HistoricalSeries, MergeEffect, ProviderResult, ScheduleConfig,
    Snapshot, StorageConfig,
};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::backfill::{fetch_start, plan_backfill, BackfillReport};
use super::ports::{CommitSource, FollowerProvider, Notifier, PageRenderer};
use crate::history::{BackupFailure, LoadReport, ReconcileError, SeriesReconciler, SeriesSource};
use crate::metrics::build_snapshot;

/// Notification context used when the series could not be persisted.
pub const SAVE_FAILURE_CONTEXT: &str = "Historical data save failed";

/* -------------------------------------------------------------------------- */
/* Settings & reports */
/* -------------------------------------------------------------------------- */

/// Per-tick knobs resolved from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSettings {
    /// Upper bound on each provider fetch.
    pub provider_timeout: Duration,
    /// Zone that decides the snapshot date and the January 1st anchor.
    pub timezone: Tz,
    /// Year whose January 1st anchors the commit count; current year if unset.
    pub commit_anchor_year: Option<i32>,
    /// Storage key of the published page.
    pub page_key: String,
}

impl TickSettings {
    /// # Errors
    /// Returns `CloutError::Config` if the configured timezone is unknown.
    pub fn from_config(
        schedule: &ScheduleConfig,
        storage: &StorageConfig,
    ) -> clout_domain::Result<Self> {
        Ok(Self {
            provider_timeout: schedule.provider_timeout(),
            timezone: schedule.timezone()?,
            commit_anchor_year: schedule.commit_anchor_year,
            page_key: storage.page_key.clone(),
        })
    }
}

/// What a tick did to the series.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A snapshot was merged and the primary document written.
    Recorded {
        snapshot: Snapshot,
        effect: MergeEffect,
        source: SeriesSource,
        backup_failures: Vec<BackupFailure>,
    },
    /// The commit count was unavailable; nothing was recorded.
    Skipped { reason: FetchFailure },
}

/// Result of [`TickService::run_tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Snapshot date in the dashboard timezone.
    pub date: NaiveDate,
    /// Instant commits were counted from.
    pub anchor: DateTime<Utc>,
    pub outcome: TickOutcome,
    /// Follower providers whose fetch failed this tick.
    pub provider_failures: BTreeMap<String, FetchFailure>,
    /// Whether the dashboard page was written.
    pub page_published: bool,
}

impl TickReport {
    /// A snapshot was merged and saved.
    pub fn is_recorded(&self) -> bool {
        matches!(self.outcome, TickOutcome::Recorded { .. })
    }
}

/// Failures of a tick, backfill or republish.
#[derive(Debug, Error)]
pub enum TickError {
    /// The series could not be loaded for update or saved.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The configured anchor year has no January 1st in the timezone.
    #[error("no valid January 1st for anchor year {0}")]
    InvalidAnchor(i32),

    /// Backfill start lies after its end.
    #[error("invalid backfill range: {since} is after {until}")]
    InvalidRange { since: NaiveDate, until: NaiveDate },

    /// Daily commit counts could not be fetched.
    #[error("failed to fetch daily commit counts: {0}")]
    Backfill(FetchFailure),

    /// Rendering or writing the page failed.
    #[error("failed to publish dashboard: {0}")]
    Publish(CloutError),
}

impl ErrorClassification for TickError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Reconcile(err) => err.is_retryable(),
            Self::Backfill(failure) => failure.kind.is_retryable(),
            Self::Publish(err) => matches!(err, CloutError::Network(_)),
            Self::InvalidAnchor(_) | Self::InvalidRange { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Reconcile(err) => err.severity(),
            Self::InvalidAnchor(_) | Self::InvalidRange { .. } => ErrorSeverity::Warning,
            Self::Backfill(_) | Self::Publish(_) => ErrorSeverity::Error,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Service */
/* -------------------------------------------------------------------------- */

/// Drives a tick: fetch, aggregate, reconcile, publish.
pub struct TickService {
    reconciler: SeriesReconciler,
    commits: Arc<dyn CommitSource>,
    providers: Vec<Arc<dyn FollowerProvider>>,
    notifier: Arc<dyn Notifier>,
    renderer: Option<Arc<dyn PageRenderer>>,
    clock: Arc<dyn Clock>,
    settings: TickSettings,
}

impl TickService {
    /// Service without follower providers or a page renderer.
    pub fn new(
        reconciler: SeriesReconciler,
        commits: Arc<dyn CommitSource>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: TickSettings,
    ) -> Self {
        Self {
            reconciler,
            commits,
            providers: Vec::new(),
            notifier,
            renderer: None,
            clock,
            settings,
        }
    }

    /// Poll an additional follower platform every tick.
    pub fn with_provider(mut self, provider: Arc<dyn FollowerProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Publish a page after every successful save.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Settings this service was built with.
    pub fn settings(&self) -> &TickSettings {
        &self.settings
    }

    /// Reconciler owning the stored series.
    pub fn reconciler(&self) -> &SeriesReconciler {
        &self.reconciler
    }

    /// Run one tick.
    ///
    /// # Errors
    /// Returns [`TickError::Reconcile`] when the series store could not be
    /// read or the primary document could not be written; the notifier has
    /// already been invoked in that case.
    #[instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn run_tick(&self) -> Result<TickReport, TickError> {
        let now = self.clock.now();
        let date = now.with_timezone(&self.settings.timezone).date_naive();
        let anchor = self.commit_anchor(now)?;
        info!(%date, %anchor, "starting tick");

        let (commit_result, provider_results) = self.fetch_all(anchor).await;

        let provider_failures: BTreeMap<String, FetchFailure> = provider_results
            .iter()
            .filter_map(|(name, result)| {
                result.as_ref().err().map(|failure| (name.clone(), failure.clone()))
            })
            .collect();

        let commit_count = match commit_result {
            Ok(count) => count,
            Err(reason) => {
                warn!(
                    kind = %reason.kind,
                    error = %reason.message,
                    "commit count unavailable; skipping snapshot for this tick"
                );
                let page_published = self.republish_best_effort(now).await;
                return Ok(TickReport {
                    date,
                    anchor,
                    outcome: TickOutcome::Skipped { reason },
                    provider_failures,
                    page_published,
                });
            }
        };

        let snapshot = build_snapshot(date, commit_count, &provider_results);

        let report = match self.reconciler.reconcile(snapshot.clone()).await {
            Ok(report) => report,
            Err(err) => return Err(self.save_failed(err).await),
        };

        let page_published = self.publish_best_effort(&report.series, now).await;

        info!(
            %date,
            commit_count,
            entries = report.series.len(),
            effect = ?report.effect,
            page_published,
            "tick complete"
        );

        Ok(TickReport {
            date,
            anchor,
            outcome: TickOutcome::Recorded {
                snapshot,
                effect: report.effect,
                source: report.source,
                backup_failures: report.save.backup_failures,
            },
            provider_failures,
            page_published,
        })
    }

    /// Re-render the page from the stored series without polling providers.
    ///
    /// # Errors
    /// Returns [`TickError::Publish`] if rendering or the page write fails.
    pub async fn republish(&self) -> Result<SeriesSource, TickError> {
        let loaded = self.reconciler.load_series().await;
        self.publish(&loaded.series, self.clock.now()).await.map_err(TickError::Publish)?;
        Ok(loaded.source)
    }

    /// Rebuild history for `since..=until` from daily commit counts.
    ///
    /// `until` defaults to today in the dashboard timezone. Daily counts are
    /// fetched from the commit anchor of `since` so every planned day carries
    /// the same cumulative total a tick on that day would have recorded. All
    /// planned snapshots are merged into the stored series and written with a
    /// single save; existing entries for the same dates are replaced.
    ///
    /// # Errors
    /// Fails on an inverted range or when the daily counts cannot be fetched.
    /// A load or save failure is returned after the notifier was invoked.
    #[instrument(skip(self, followers))]
    pub async fn backfill(
        &self,
        since: NaiveDate,
        until: Option<NaiveDate>,
        followers: &BTreeMap<String, u64>,
    ) -> Result<BackfillReport, TickError> {
        let now = self.clock.now();
        let until =
            until.unwrap_or_else(|| now.with_timezone(&self.settings.timezone).date_naive());
        if since > until {
            return Err(TickError::InvalidRange { since, until });
        }

        let anchor_year = self.settings.commit_anchor_year;
        let from = fetch_start(since, anchor_year);
        let daily = self
            .commits
            .daily_commit_counts(from, until, self.settings.timezone)
            .await
            .map_err(TickError::Backfill)?;
        let plan = plan_backfill(since, until, anchor_year, &daily, followers);
        info!(%since, %until, %from, days = plan.len(), "planned backfill");

        let LoadReport { mut series, corrupt_primary, .. } =
            match self.reconciler.load_for_update().await {
                Ok(loaded) => loaded,
                Err(err) => return Err(self.save_failed(err).await),
            };
        let (mut inserted, mut replaced, mut unchanged) = (0, 0, 0);
        for snapshot in plan {
            match series.upsert(snapshot) {
                MergeEffect::Inserted => inserted += 1,
                MergeEffect::Replaced => replaced += 1,
                MergeEffect::Unchanged => unchanged += 1,
            }
        }

        let save = match self.reconciler.commit(&series, corrupt_primary).await {
            Ok(save) => save,
            Err(err) => return Err(self.save_failed(err).await),
        };
        self.publish_best_effort(&series, now).await;

        info!(inserted, replaced, unchanged, entries = series.len(), "backfill complete");
        Ok(BackfillReport { since, until, inserted, replaced, unchanged, save })
    }

    async fn save_failed(&self, err: ReconcileError) -> TickError {
        error!(error = %err, "series not saved; durable state unchanged");
        self.notifier.notify_failure(SAVE_FAILURE_CONTEXT, &err.to_string()).await;
        err.into()
    }

    fn commit_anchor(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TickError> {
        let tz = self.settings.timezone;
        let year = self.settings.commit_anchor_year.unwrap_or_else(|| now.with_timezone(&tz).year());
        tz.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or(TickError::InvalidAnchor(year))
    }

    async fn fetch_all(
        &self,
        anchor: DateTime<Utc>,
    ) -> (ProviderResult, BTreeMap<String, ProviderResult>) {
        let limit = self.settings.provider_timeout;

        let commits = with_timeout(limit, "commits", self.commits.count_commits_since(anchor));
        let followers = join_all(self.providers.iter().map(|provider| async move {
            let name = provider.name().to_string();
            let result = with_timeout(limit, &name, provider.fetch_current_count()).await;
            (name, result)
        }));

        let (commit_result, follower_results) = tokio::join!(commits, followers);
        debug!(
            commits_ok = commit_result.is_ok(),
            providers = follower_results.len(),
            "provider fetches finished"
        );
        (commit_result, follower_results.into_iter().collect())
    }

    async fn publish(
        &self,
        series: &HistoricalSeries,
        rendered_at: DateTime<Utc>,
    ) -> clout_domain::Result<()> {
        let Some(renderer) = &self.renderer else {
            debug!("no page renderer configured; skipping publish");
            return Ok(());
        };
        let page = renderer.render(series, series.latest(), rendered_at)?;
        self.reconciler
            .store()
            .put(&self.settings.page_key, page.body, &page.content_type)
            .await?;
        info!(key = %self.settings.page_key, "published dashboard");
        Ok(())
    }

    async fn publish_best_effort(&self, series: &HistoricalSeries, at: DateTime<Utc>) -> bool {
        if self.renderer.is_none() {
            return false;
        }
        match self.publish(series, at).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %self.settings.page_key, error = %err, "dashboard publish failed");
                false
            }
        }
    }

    async fn republish_best_effort(&self, at: DateTime<Utc>) -> bool {
        if self.renderer.is_none() {
            return false;
        }
        let loaded = self.reconciler.load_series().await;
        self.publish_best_effort(&loaded.series, at).await
    }
}

async fn with_timeout<F>(limit: Duration, name: &str, fetch: F) -> ProviderResult
where
    F: std::future::Future<Output = ProviderResult>,
{
    match tokio::time::timeout(limit, fetch).await {
        Ok(result) => result,
        Err(_) => {
            warn!(provider = name, timeout_secs = limit.as_secs(), "provider fetch timed out");
            Err(FetchFailure::transport(format!("timed out after {}s", limit.as_secs())))
        }
    }
}
