//! Metrics aggregation
//!
//! Combines the commit count and per-provider follower results into a
//! single [`Snapshot`](clout_domain::Snapshot).

mod aggregator;

pub use aggregator::{build_snapshot, MetricsAggregator};
