//! Provider identities and fetch failure classification

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::CloutError;

/// Name under which the commit-hosting provider is logged.
///
/// It produces the commit count and never appears in `follower_counts`.
pub const COMMIT_PROVIDER: &str = "github";

/// Social platforms that contribute a follower count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowerPlatform {
    Twitter,
    #[serde(rename = "youtube")]
    YouTube,
    Bluesky,
}

impl FollowerPlatform {
    /// Every supported platform, in display order.
    pub const ALL: [FollowerPlatform; 3] = [Self::Twitter, Self::YouTube, Self::Bluesky];

    /// Stable key used in `follower_counts`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::YouTube => "youtube",
            Self::Bluesky => "bluesky",
        }
    }

    /// Human label shown on the dashboard.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Twitter => "X/Twitter Followers",
            Self::YouTube => "YouTube Subscribers",
            Self::Bluesky => "Bluesky Followers",
        }
    }

    /// Resolve a `follower_counts` key back to a platform.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|platform| platform.as_str() == key)
    }
}

impl fmt::Display for FollowerPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason category for a failed provider fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    Auth,
    RateLimited,
    Transport,
    MalformedResponse,
}

impl FetchFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::MalformedResponse => "malformed_response",
        }
    }

    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transport)
    }
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider fetch that did not yield a count.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    pub kind: FetchFailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::Auth, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::RateLimited, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::Transport, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::MalformedResponse, message)
    }
}

/// Adapter errors surfacing from a provider request.
impl From<CloutError> for FetchFailure {
    fn from(value: CloutError) -> Self {
        match value {
            CloutError::Auth(msg) => Self::auth(msg),
            CloutError::RateLimited(msg) => Self::rate_limited(msg),
            CloutError::Serialization(msg) => Self::malformed(msg),
            other => Self::transport(other.to_string()),
        }
    }
}

/// Outcome of a single provider fetch.
pub type ProviderResult = std::result::Result<u64, FetchFailure>;
