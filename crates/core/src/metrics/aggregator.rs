use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clout_common::Clock;
use clout_domain::{ProviderResult, Snapshot};
use tracing::{debug, warn};

/// Build a snapshot from a commit count and provider results.
///
/// Failed providers are omitted from `follower_counts`; the ratio is computed
/// from whatever counts remain and is undefined when none do.
pub fn build_snapshot(
    date: NaiveDate,
    commit_count: u64,
    provider_results: &BTreeMap<String, ProviderResult>,
) -> Snapshot {
    let mut follower_counts = BTreeMap::new();

    for (provider, result) in provider_results {
        match result {
            Ok(count) => {
                follower_counts.insert(provider.clone(), *count);
            }
            Err(failure) => {
                warn!(
                    provider = %provider,
                    kind = %failure.kind,
                    error = %failure.message,
                    "provider fetch failed; omitting from snapshot"
                );
            }
        }
    }

    let snapshot = Snapshot::new(date, commit_count, follower_counts);
    debug!(
        date = %snapshot.date(),
        commit_count = snapshot.commit_count(),
        total_followers = snapshot.total_followers(),
        ratio = ?snapshot.ratio(),
        "built snapshot"
    );
    snapshot
}

/// Aggregator that resolves "today" from a clock in the dashboard timezone.
#[derive(Clone)]
pub struct MetricsAggregator {
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl MetricsAggregator {
    pub fn new(clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self { clock, timezone }
    }

    /// Calendar date of the current instant in the dashboard timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.timezone).date_naive()
    }

    /// Like [`build_snapshot`], defaulting the date to [`Self::today`].
    pub fn build_snapshot(
        &self,
        date: Option<NaiveDate>,
        commit_count: u64,
        provider_results: &BTreeMap<String, ProviderResult>,
    ) -> Snapshot {
        build_snapshot(date.unwrap_or_else(|| self.today()), commit_count, provider_results)
    }
}
