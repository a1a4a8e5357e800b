//! Dated observation of commit activity and follower counts

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sum of all known follower counts.
pub fn total_followers(follower_counts: &BTreeMap<String, u64>) -> u64 {
    follower_counts.values().fold(0u64, |acc, count| acc.saturating_add(*count))
}

/// Commits per follower, or `None` when no follower is known.
pub fn compute_ratio(commit_count: u64, follower_counts: &BTreeMap<String, u64>) -> Option<f64> {
    let total = total_followers(follower_counts);
    if total == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = commit_count as f64 / total as f64;
    ratio.is_finite().then_some(ratio)
}

/// One observation for a single calendar date.
///
/// The ratio is derived from the other fields at construction time and
/// recomputed on deserialization, so a stored ratio never drifts from the
/// inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotRecord", into = "SnapshotRecord")]
pub struct Snapshot {
    date: NaiveDate,
    commit_count: u64,
    follower_counts: BTreeMap<String, u64>,
    ratio: Option<f64>,
}

impl Snapshot {
    pub fn new(date: NaiveDate, commit_count: u64, follower_counts: BTreeMap<String, u64>) -> Self {
        let ratio = compute_ratio(commit_count, &follower_counts);
        Self { date, commit_count, follower_counts, ratio }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    pub fn follower_counts(&self) -> &BTreeMap<String, u64> {
        &self.follower_counts
    }

    pub fn follower_count(&self, provider: &str) -> Option<u64> {
        self.follower_counts.get(provider).copied()
    }

    pub fn total_followers(&self) -> u64 {
        total_followers(&self.follower_counts)
    }

    /// `None` is the "undefined" sentinel (no known followers).
    pub fn ratio(&self) -> Option<f64> {
        self.ratio
    }
}

/// Wire shape of a snapshot inside the series document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotRecord {
    date: NaiveDate,
    commit_count: u64,
    #[serde(default)]
    follower_counts: BTreeMap<String, u64>,
    #[serde(default)]
    ratio: Option<f64>,
}

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        // Stored ratio is informational only.
        Snapshot::new(record.date, record.commit_count, record.follower_counts)
    }
}

impl From<Snapshot> for SnapshotRecord {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotRecord {
            date: snapshot.date,
            commit_count: snapshot.commit_count,
            follower_counts: snapshot.follower_counts,
            ratio: snapshot.ratio,
        }
    }
}
