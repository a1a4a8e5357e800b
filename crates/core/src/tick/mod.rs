//! Tick orchestration
//!
//! A tick fetches the commit count and follower counts concurrently, builds
//! a snapshot, reconciles it into the durable series and republishes the
//! dashboard.

mod backfill;
pub mod ports;
mod service;

pub use backfill::{count_anchor, fetch_start, plan_backfill, BackfillReport};
pub use service::{TickError, TickOutcome, TickReport, TickService, TickSettings, SAVE_FAILURE_CONTEXT};
