//! Persisted series document and schema migration
//!
//! Version 1 is the current layout:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "last_updated": "2024-01-02T08:00:00Z",
//!   "entries": [
//!     {"date": "2024-01-01", "commit_count": 5, "follower_counts": {"x": 100}, "ratio": 0.05}
//!   ]
//! }
//! ```
//!
//! Documents without a `schema_version` marker but with a top-level `data`
//! array were written by the earlier deployment (one Twitter count per
//! entry) and are migrated on read as version 0.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::provider::FollowerPlatform;
use super::series::HistoricalSeries;
use super::snapshot::Snapshot;
use crate::constants::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};

/// Reasons a stored document could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document is empty")]
    Empty,

    #[error("document is malformed: {0}")]
    Malformed(String),

    #[error("document schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u64, supported: u32 },
}

/// Durable wrapper around the historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument {
    pub schema_version: u32,
    pub last_updated: DateTime<Utc>,
    pub entries: Vec<Snapshot>,
}

impl SeriesDocument {
    /// Wrap a series at the current schema version.
    pub fn new(series: &HistoricalSeries, last_updated: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            last_updated,
            entries: series.entries().to_vec(),
        }
    }

    /// Sorted, de-duplicated series regardless of stored order.
    pub fn into_series(self) -> HistoricalSeries {
        HistoricalSeries::from_entries(self.entries)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Parse any supported schema version, migrating older layouts.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DocumentError::Empty);
        }

        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| DocumentError::Malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| DocumentError::Malformed("top-level value is not an object".into()))?;

        match object.get("schema_version") {
            Some(raw) => {
                let version = raw.as_u64().ok_or_else(|| {
                    DocumentError::Malformed("schema_version is not an unsigned integer".into())
                })?;
                if version > u64::from(CURRENT_SCHEMA_VERSION) {
                    return Err(DocumentError::UnsupportedSchema {
                        found: version,
                        supported: CURRENT_SCHEMA_VERSION,
                    });
                }
                if version == u64::from(LEGACY_SCHEMA_VERSION) {
                    return migrate_legacy(value);
                }
                serde_json::from_value(value).map_err(|e| DocumentError::Malformed(e.to_string()))
            }
            None if object.contains_key("data") => migrate_legacy(value),
            None => Err(DocumentError::Malformed("missing schema_version".into())),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Legacy (version 0) layout */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    data: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    date: NaiveDate,
    github_commits: u64,
    #[serde(default)]
    twitter_followers: Option<u64>,
    #[serde(default)]
    last_updated: Option<String>,
}

fn migrate_legacy(value: Value) -> Result<SeriesDocument, DocumentError> {
    let legacy: LegacyDocument =
        serde_json::from_value(value).map_err(|e| DocumentError::Malformed(e.to_string()))?;

    let last_updated = legacy
        .data
        .iter()
        .filter_map(|entry| entry.last_updated.as_deref())
        .filter_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|stamp| stamp.with_timezone(&Utc))
        .max()
        .unwrap_or_default();

    let entries = legacy
        .data
        .into_iter()
        .map(|entry| {
            let mut follower_counts = BTreeMap::new();
            if let Some(count) = entry.twitter_followers {
                follower_counts.insert(FollowerPlatform::Twitter.as_str().to_string(), count);
            }
            Snapshot::new(entry.date, entry.github_commits, follower_counts)
        })
        .collect();

    Ok(SeriesDocument { schema_version: CURRENT_SCHEMA_VERSION, last_updated, entries })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_current_schema() {
        let raw = br#"{
            "schema_version": 1,
            "last_updated": "2024-01-02T08:00:00Z",
            "entries": [
                {"date":"2024-01-02","commit_count":8,"follower_counts":{"x":110},"ratio":null},
                {"date":"2024-01-01","commit_count":5,"follower_counts":{"x":100},"ratio":0.05}
            ]
        }"#;
        let document = SeriesDocument::parse(raw).unwrap();
        assert_eq!(document.schema_version, 1);
        assert_eq!(document.last_updated, Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap());

        let series = document.into_series();
        assert_eq!(series.entries()[0].date().to_string(), "2024-01-01");
        // ratio recomputed even though the stored value was null
        assert!((series.entries()[1].ratio().unwrap() - 8.0 / 110.0).abs() < 1e-12);
    }

    #[test]
    fn migrates_legacy_layout() {
        let raw = br#"{"data": [
            {"date":"2025-01-01","github_commits":3,"twitter_followers":35,"ratio":0.1,
             "last_updated":"2025-01-01T10:00:00-08:00"},
            {"date":"2025-01-02","github_commits":9,"twitter_followers":36,"ratio":0.3,
             "last_updated":"2025-01-02T10:00:00-08:00"}
        ]}"#;
        let document = SeriesDocument::parse(raw).unwrap();
        assert_eq!(document.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(document.last_updated, Utc.with_ymd_and_hms(2025, 1, 2, 18, 0, 0).unwrap());
        assert_eq!(document.entries[1].commit_count(), 9);
        assert_eq!(document.entries[1].follower_count("twitter"), Some(36));
        assert!((document.entries[1].ratio().unwrap() - 9.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_newer_schema() {
        let raw = br#"{"schema_version": 7, "last_updated": "2024-01-01T00:00:00Z", "entries": []}"#;
        assert_eq!(
            SeriesDocument::parse(raw),
            Err(DocumentError::UnsupportedSchema { found: 7, supported: CURRENT_SCHEMA_VERSION })
        );
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(SeriesDocument::parse(b""), Err(DocumentError::Empty));
        assert_eq!(SeriesDocument::parse(b"  \n"), Err(DocumentError::Empty));
        assert!(matches!(SeriesDocument::parse(b"{not json"), Err(DocumentError::Malformed(_))));
        assert!(matches!(SeriesDocument::parse(b"[1,2]"), Err(DocumentError::Malformed(_))));
        assert!(matches!(SeriesDocument::parse(b"{}"), Err(DocumentError::Malformed(_))));
    }

    #[test]
    fn written_document_parses_back() {
        let series = HistoricalSeries::from_entries(vec![Snapshot::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            4,
            BTreeMap::from([("bluesky".to_string(), 8)]),
        )]);
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let bytes = SeriesDocument::new(&series, stamp).to_json_bytes().unwrap();

        let parsed = SeriesDocument::parse(&bytes).unwrap();
        assert_eq!(parsed.last_updated, stamp);
        assert_eq!(parsed.into_series(), series);
    }
}
