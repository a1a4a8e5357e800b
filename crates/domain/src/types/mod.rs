//! Domain types and models
//!
//! A [`Snapshot`] is one dated observation, a [`HistoricalSeries`] is the
//! ordered collection of them, and a [`SeriesDocument`] is the durable
//! wrapper written to storage.

pub mod document;
pub mod provider;
pub mod series;
pub mod snapshot;

pub use document::{DocumentError, SeriesDocument};
pub use provider::{
    FetchFailure, FetchFailureKind, FollowerPlatform, ProviderResult, COMMIT_PROVIDER,
};
pub use series::{HistoricalSeries, MergeEffect};
pub use snapshot::{compute_ratio, total_followers, Snapshot};
