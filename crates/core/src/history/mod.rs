//! Historical store reconciliation
//!
//! Owns the read-modify-write of the durable series under a primary/backup
//! redundancy scheme.

pub mod ports;
mod reconciler;

pub use reconciler::{
    BackupFailure, LoadIssue, LoadReport, ReconcileError, ReconcileReport, SaveReport,
    SeriesKeys, SeriesReconciler, SeriesSource,
};
