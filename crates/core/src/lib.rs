//! # Commits or Clout Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for providers, storage, notification
//!   and rendering
//! - The metrics aggregator that turns provider results into a snapshot
//! - The historical store reconciler (load, merge, save with backups)
//! - The tick service that drives one scheduled execution
//!
//! ## Architecture Principles
//! - Only depends on `clout-common` and `clout-domain`
//! - No HTTP or object-store code
//! - All external dependencies via traits

pub mod history;
pub mod metrics;
pub mod tick;

// Re-export specific items to avoid ambiguity
pub use history::ports::DocumentStore;
pub use history::{
    BackupFailure, LoadIssue, LoadReport, ReconcileError, ReconcileReport, SaveReport,
    SeriesKeys, SeriesReconciler, SeriesSource,
};
pub use metrics::{build_snapshot, MetricsAggregator};
pub use tick::ports::{CommitSource, FollowerProvider, Notifier, PageRenderer, RenderedPage};
pub use tick::{
    count_anchor, fetch_start, plan_backfill, BackfillReport, TickError, TickOutcome, TickReport, TickService, TickSettings,
    SAVE_FAILURE_CONTEXT,
};
