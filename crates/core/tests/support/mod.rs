//! Shared test helpers for `clout-core` integration tests.
//!
//! In-memory mocks for every core port so the reconciliation and tick tests
//! can focus on behaviour instead of wiring.

#![allow(dead_code)]

pub mod providers;
pub mod store;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use clout_domain::Snapshot;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Snapshot with the given follower counts, keyed by provider name.
pub fn snapshot(day: NaiveDate, commits: u64, followers: &[(&str, u64)]) -> Snapshot {
    let counts: BTreeMap<String, u64> =
        followers.iter().map(|(name, count)| ((*name).to_string(), *count)).collect();
    Snapshot::new(day, commits, counts)
}
