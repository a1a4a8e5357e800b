//! # Commits or Clout Infrastructure
//!
//! Adapters implementing the ports defined in `clout-core`.
//!
//! This crate contains:
//! - The retrying HTTP client and the provider clients built on it
//! - The object-store document store
//! - The webhook and log notifiers
//! - The HTML dashboard renderer
//! - Configuration loading and the interval tick scheduler
//!
//! ## Architecture
//! - Implements traits defined in `clout-core`
//! - Contains all "impure" code (network, storage, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod notify;
pub mod render;
pub mod scheduling;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::{
    follower_providers, BlueskyFollowers, GitHubCommitSource, TwitterFollowers, YouTubeSubscribers,
};
pub use notify::{notifier_from_config, LogNotifier, WebhookNotifier};
pub use render::DashboardRenderer;
pub use scheduling::{SchedulerError, TickScheduler, TickSchedulerConfig};
pub use storage::ObjectDocumentStore;
