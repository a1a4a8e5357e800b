//! Load, merge and save of the persisted series
//!
//! Read path: primary document, then the fixed backup, then an empty series.
//! A missing or corrupt document is never fatal. A read that fails outright
//! is: if no document loaded and either read errored, the write is refused
//! so a flaky store cannot replace history with an empty series.
//!
//! Write path: the primary is written first and is the only hard
//! requirement. A timestamped backup (`<prefix>_<YYYYMMDD_HHMMSS>`) and the
//! fixed "last known good" backup follow on a best-effort basis. Nothing is
//! written at all if the primary write fails, so durable state stays exactly
//! as it was before the tick.
//!
//! The sequence is a last-writer-wins read-modify-write. It assumes the
//! scheduler never runs two ticks at once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clout_common::{Clock, ErrorClassification, ErrorSeverity};
use clout_domain::constants::{BACKUP_TIMESTAMP_FORMAT, JSON_CONTENT_TYPE};
use clout_domain::{
    CloutError, HistoricalSeries, MergeEffect, SeriesDocument, Snapshot, StorageConfig,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::ports::DocumentStore;

/* -------------------------------------------------------------------------- */
/* Keys */
/* -------------------------------------------------------------------------- */

/// Logical storage keys for the series document and its backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesKeys {
    /// Authoritative series document.
    pub primary: String,
    /// Fixed "last known good" copy, read when the primary is unusable.
    pub backup: String,
    /// Prefix of the dated backups.
    pub backup_prefix: String,
}

impl SeriesKeys {
    pub fn new(
        primary: impl Into<String>,
        backup: impl Into<String>,
        backup_prefix: impl Into<String>,
    ) -> Self {
        Self { primary: primary.into(), backup: backup.into(), backup_prefix: backup_prefix.into() }
    }

    /// Keys named by the storage section of the config.
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(&storage.history_key, &storage.backup_key, &storage.backup_prefix)
    }

    /// Backup key embedding the write time, so dated backups accumulate.
    pub fn timestamped_backup(&self, written_at: DateTime<Utc>) -> String {
        format!("{}_{}", self.backup_prefix, written_at.format(BACKUP_TIMESTAMP_FORMAT))
    }

    /// Key under which an unparseable primary is preserved before overwrite.
    pub fn quarantine(&self, at: DateTime<Utc>) -> String {
        format!("{}.corrupt_{}", self.primary, at.format(BACKUP_TIMESTAMP_FORMAT))
    }
}

/* -------------------------------------------------------------------------- */
/* Reports */
/* -------------------------------------------------------------------------- */

/// Which document the loaded series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    /// Parsed from the primary document.
    Primary,
    /// Recovered from the fixed backup.
    Backup,
    /// Neither document was usable; first-run state.
    Empty,
}

impl SeriesSource {
    /// Stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
            Self::Empty => "empty",
        }
    }
}

/// A recoverable problem encountered while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadIssue {
    /// The document does not exist.
    Missing { key: String },
    /// The document exists but does not parse.
    Corrupt { key: String, reason: String },
    /// The store returned an error for the read.
    Unreadable { key: String, reason: String },
}

impl LoadIssue {
    /// Storage key the issue applies to.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::Corrupt { key, .. } | Self::Unreadable { key, .. } => key,
        }
    }
}

/// Result of [`SeriesReconciler::load_series`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Loaded series; empty when nothing was usable.
    pub series: HistoricalSeries,
    pub source: SeriesSource,
    /// Problems met before a usable document was found.
    pub issues: Vec<LoadIssue>,
    /// Raw bytes of a present-but-unparseable primary document.
    pub corrupt_primary: Option<Vec<u8>>,
}

impl LoadReport {
    /// Nothing loaded and at least one read failed, so the empty series
    /// may be hiding stored history.
    pub fn is_unavailable(&self) -> bool {
        self.source == SeriesSource::Empty
            && self.issues.iter().any(|issue| matches!(issue, LoadIssue::Unreadable { .. }))
    }
}

/// A backup write that failed after the primary was saved.

#[derive(Debug, Clone, PartialEq)]
pub struct BackupFailure {
    pub key: String,
    /// Store error returned for the put.
    pub error: CloutError,
}

/// Result of a successful [`SeriesReconciler::save_series`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub primary_key: String,
    /// Dated backup key attempted for this save.
    pub timestamped_backup_key: String,
    /// Clock reading stamped into the document and the dated key.
    pub written_at: DateTime<Utc>,
    /// Size of the serialized document.
    pub bytes: usize,
    /// Backup writes that failed; these do not fail the save.
    pub backup_failures: Vec<BackupFailure>,
}

/// Result of a full load → merge → save.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Series as written.
    pub series: HistoricalSeries,
    /// Where the pre-merge series was loaded from.
    pub source: SeriesSource,
    pub issues: Vec<LoadIssue>,
    /// How the snapshot changed the series.
    pub effect: MergeEffect,
    pub save: SaveReport,
}

/// Failures that leave the primary document unwritten.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Neither document could be read; stored history is left alone.
    #[error("series store unavailable, refusing to overwrite history: {reasons}")]
    Unavailable { reasons: String },

    /// The series could not be encoded.
    #[error("failed to serialize series document: {0}")]
    Serialize(String),

    /// The store rejected the primary put.
    #[error("failed to write primary series document '{key}': {source}")]
    PrimaryWrite {
        key: String,
        #[source]
        source: CloutError,
    },
}

impl ErrorClassification for ReconcileError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Serialize(_) => false,
            Self::PrimaryWrite { source, .. } => {
                matches!(source, CloutError::Network(_) | CloutError::RateLimited(_))
            }
        }
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

/* -------------------------------------------------------------------------- */
/* Reconciler */
/* -------------------------------------------------------------------------- */

/// Maintains the durable historical series.
#[derive(Clone)]
pub struct SeriesReconciler {
    store: Arc<dyn DocumentStore>,
    keys: SeriesKeys,
    clock: Arc<dyn Clock>,
}

impl SeriesReconciler {
    /// Reconciler over `store`, stamping writes with `clock`.
    pub fn new(store: Arc<dyn DocumentStore>, keys: SeriesKeys, clock: Arc<dyn Clock>) -> Self {
        Self { store, keys, clock }
    }

    /// Keys read and written by this reconciler.
    pub fn keys(&self) -> &SeriesKeys {
        &self.keys
    }

    /// Underlying store, shared with the page publisher.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Load the series, falling back from primary to backup to empty.
    #[instrument(skip(self), fields(primary = %self.keys.primary, backup = %self.keys.backup))]
    pub async fn load_series(&self) -> LoadReport {
        let mut issues = Vec::new();
        let mut corrupt_primary = None;

        let candidates = [
            (self.keys.primary.as_str(), SeriesSource::Primary),
            (self.keys.backup.as_str(), SeriesSource::Backup),
        ];

        for (key, source) in candidates {
            match self.read_document(key).await {
                Ok(series) => {
                    if source == SeriesSource::Backup {
                        warn!(
                            key,
                            entries = series.len(),
                            "primary series unavailable; recovered from backup"
                        );
                    } else {
                        info!(key, entries = series.len(), "loaded series");
                    }
                    return LoadReport { series, source, issues, corrupt_primary };
                }
                Err((issue, raw)) => {
                    if source == SeriesSource::Primary {
                        corrupt_primary = raw;
                    }
                    issues.push(issue);
                }
            }
        }

        warn!(
            issues = issues.len(),
            "no readable series document; starting from an empty series"
        );
        LoadReport { series: HistoricalSeries::new(), source: SeriesSource::Empty, issues, corrupt_primary }
    }

    /// Load the series ahead of a write.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Unavailable`] when no document loaded and a
    /// read failed with a store error.
    pub async fn load_for_update(&self) -> Result<LoadReport, ReconcileError> {
        let loaded = self.load_series().await;
        if loaded.is_unavailable() {
            let reasons = loaded
                .issues
                .iter()
                .map(|issue| match issue {
                    LoadIssue::Missing { key } => format!("{key}: missing"),
                    LoadIssue::Corrupt { key, reason } | LoadIssue::Unreadable { key, reason } => {
                        format!("{key}: {reason}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            error!(%reasons, "series store unavailable; not saving");
            return Err(ReconcileError::Unavailable { reasons });
        }
        Ok(loaded)
    }

    /// Insert or replace the entry for `snapshot.date()`.
    pub fn merge(series: HistoricalSeries, snapshot: Snapshot) -> HistoricalSeries {
        series.merge(snapshot)
    }

    /// Write the series to the primary key, then to both backups.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] if the primary document could not be
    /// written; no backup is attempted in that case.
    #[instrument(skip(self, series), fields(entries = series.len()))]
    pub async fn save_series(
        &self,
        series: &HistoricalSeries,
    ) -> Result<SaveReport, ReconcileError> {
        let written_at = self.clock.now();
        let bytes = SeriesDocument::new(series, written_at)
            .to_json_bytes()
            .map_err(|e| ReconcileError::Serialize(e.to_string()))?;
        let size = bytes.len();

        self.store.put(&self.keys.primary, bytes.clone(), JSON_CONTENT_TYPE).await.map_err(
            |source| {
                error!(key = %self.keys.primary, error = %source, "primary series write failed");
                ReconcileError::PrimaryWrite { key: self.keys.primary.clone(), source }
            },
        )?;
        info!(key = %self.keys.primary, bytes = size, "wrote primary series");

        let timestamped_backup_key = self.keys.timestamped_backup(written_at);
        let mut backup_failures = Vec::new();
        for key in [timestamped_backup_key.clone(), self.keys.backup.clone()] {
            match self.store.put(&key, bytes.clone(), JSON_CONTENT_TYPE).await {
                Ok(()) => info!(key = %key, "wrote series backup"),
                Err(error) => {
                    warn!(key = %key, error = %error, "series backup write failed");
                    backup_failures.push(BackupFailure { key, error });
                }
            }
        }

        Ok(SaveReport {
            primary_key: self.keys.primary.clone(),
            timestamped_backup_key,
            written_at,
            bytes: size,
            backup_failures,
        })
    }

    /// Save `series`, then preserve the corrupt primary it replaced.
    ///
    /// The quarantine copy is only written once the primary put succeeded.
    ///
    /// # Errors
    /// Propagates [`ReconcileError`] from [`Self::save_series`].
    pub async fn commit(
        &self,
        series: &HistoricalSeries,
        corrupt_primary: Option<Vec<u8>>,
    ) -> Result<SaveReport, ReconcileError> {
        let save = self.save_series(series).await?;
        if let Some(raw) = corrupt_primary {
            self.quarantine(raw, save.written_at).await;
        }
        Ok(save)
    }

    /// Full per-tick protocol: load → merge → save.
    ///
    /// # Errors
    /// Propagates [`ReconcileError`] from [`Self::load_for_update`] and
    /// [`Self::save_series`].
    pub async fn reconcile(&self, snapshot: Snapshot) -> Result<ReconcileReport, ReconcileError> {
        let LoadReport { mut series, source, issues, corrupt_primary } =
            self.load_for_update().await?;

        let date = snapshot.date();
        let effect = series.upsert(snapshot);
        info!(%date, effect = ?effect, source = source.as_str(), entries = series.len(), "merged snapshot");

        let save = self.commit(&series, corrupt_primary).await?;
        Ok(ReconcileReport { series, source, issues, effect, save })
    }

    async fn read_document(
        &self,
        key: &str,
    ) -> Result<HistoricalSeries, (LoadIssue, Option<Vec<u8>>)> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match SeriesDocument::parse(&bytes) {
                Ok(document) => Ok(document.into_series()),
                Err(parse_error) => {
                    error!(key, error = %parse_error, "series document is corrupt");
                    let issue = LoadIssue::Corrupt { key: key.to_string(), reason: parse_error.to_string() };
                    Err((issue, Some(bytes)))
                }
            },
            Ok(None) => {
                info!(key, "series document not found");
                Err((LoadIssue::Missing { key: key.to_string() }, None))
            }
            Err(read_error) => {
                warn!(key, error = %read_error, "series document could not be read");
                let issue = LoadIssue::Unreadable { key: key.to_string(), reason: read_error.to_string() };
                Err((issue, None))
            }
        }
    }

    /// Keep the bytes of a primary that has just been overwritten.
    async fn quarantine(&self, raw: Vec<u8>, at: DateTime<Utc>) {
        let key = self.keys.quarantine(at);
        match self.store.put(&key, raw, JSON_CONTENT_TYPE).await {
            Ok(()) => warn!(key = %key, "preserved corrupt primary series document"),
            Err(error) => {
                warn!(key = %key, error = %error, "failed to preserve corrupt primary document");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamped_backup_key_format() {
        let keys = SeriesKeys::new("h.json", "h_backup.json", "backups/historical_data");
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(keys.timestamped_backup(at), "backups/historical_data_20240102_030405");
        assert_eq!(keys.quarantine(at), "h.json.corrupt_20240102_030405");
    }

    #[test]
    fn keys_from_storage_defaults() {
        let keys = SeriesKeys::from_config(&StorageConfig::default());
        assert_eq!(keys.primary, "historical_data.json");
        assert_eq!(keys.backup, "historical_data_backup.json");
        assert_eq!(keys.backup_prefix, "backups/historical_data");
    }

    #[test]
    fn primary_write_is_critical() {
        let err = ReconcileError::PrimaryWrite {
            key: "h.json".into(),
            source: CloutError::Storage("disk full".into()),
        };
        assert!(err.is_critical());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("h.json"));
    }

    #[test]
    fn unavailable_only_when_a_read_errored_and_nothing_loaded() {
        let unreadable = LoadIssue::Unreadable { key: "h.json".into(), reason: "timeout".into() };
        let missing = LoadIssue::Missing { key: "h_backup.json".into() };
        let report = |source, issues| LoadReport {
            series: HistoricalSeries::new(),
            source,
            issues,
            corrupt_primary: None,
        };

        assert!(report(SeriesSource::Empty, vec![unreadable.clone(), missing.clone()]).is_unavailable());
        assert!(!report(SeriesSource::Empty, vec![missing.clone(), missing]).is_unavailable());
        assert!(!report(SeriesSource::Backup, vec![unreadable]).is_unavailable());
    }

    #[test]
    fn unavailable_is_critical_and_retryable() {
        let err = ReconcileError::Unavailable { reasons: "h.json: timeout".into() };
        assert!(err.is_critical());
        assert!(err.is_retryable());
    }
}
