//! Provider clients
//!
//! One client per external platform: the commit source (GitHub) and the
//! follower platforms. Each follower client is only built when its
//! credentials are configured.

pub mod bluesky;
pub mod github;
mod response;
pub mod twitter;
pub mod youtube;

use std::sync::Arc;

use clout_core::FollowerProvider;
use clout_domain::AppConfig;
use tracing::info;

pub use bluesky::BlueskyFollowers;
pub use github::GitHubCommitSource;
pub use twitter::TwitterFollowers;
pub use youtube::YouTubeSubscribers;

use crate::http::HttpClient;

/// Build a client for every configured follower platform.
pub fn follower_providers(config: &AppConfig, http: &HttpClient) -> Vec<Arc<dyn FollowerProvider>> {
    let mut providers: Vec<Arc<dyn FollowerProvider>> = Vec::new();

    if let Some(twitter) = &config.twitter {
        providers.push(Arc::new(TwitterFollowers::new(http.clone(), twitter)));
    }
    if let Some(youtube) = &config.youtube {
        providers.push(Arc::new(YouTubeSubscribers::new(http.clone(), youtube)));
    }
    if let Some(bluesky) = &config.bluesky {
        providers.push(Arc::new(BlueskyFollowers::new(http.clone(), bluesky)));
    }

    let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    info!(providers = ?names, "configured follower providers");
    providers
}
