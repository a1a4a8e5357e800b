//! X/Twitter follower count

use async_trait::async_trait;
use clout_core::FollowerProvider;
use clout_domain::{FetchFailure, FollowerPlatform, ProviderResult, TwitterConfig};
use serde::Deserialize;
use tracing::{info, instrument};

use super::response::{decode_json, endpoint};
use crate::http::HttpClient;

pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    followers_count: Option<u64>,
}

pub struct TwitterFollowers {
    http: HttpClient,
    bearer_token: String,
    username: String,
    api_base: String,
}

impl TwitterFollowers {
    pub fn new(http: HttpClient, config: &TwitterConfig) -> Self {
        Self {
            http,
            bearer_token: config.bearer_token.expose().to_string(),
            username: config.username.trim_start_matches('@').to_string(),
            api_base: config.api_base.clone().unwrap_or_else(|| TWITTER_API_BASE.to_string()),
        }
    }
}

#[async_trait]
impl FollowerProvider for TwitterFollowers {
    fn name(&self) -> &str {
        FollowerPlatform::Twitter.as_str()
    }

    #[instrument(skip(self), fields(username = %self.username))]
    async fn fetch_current_count(&self) -> ProviderResult {
        let url = endpoint(&self.api_base, &format!("2/users/by/username/{}", self.username));
        let request = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(&[("user.fields", "public_metrics")]);

        let response = self.http.send(request).await.map_err(FetchFailure::from)?;
        let body: UserResponse = decode_json(self.name(), response).await?;

        let count = body
            .data
            .and_then(|data| data.public_metrics)
            .and_then(|metrics| metrics.followers_count)
            .ok_or_else(|| FetchFailure::malformed("twitter: missing data.public_metrics.followers_count"))?;
        info!(count, "fetched twitter followers");
        Ok(count)
    }
}
