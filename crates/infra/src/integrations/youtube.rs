//! YouTube subscriber count

use async_trait::async_trait;
use clout_core::FollowerProvider;
use clout_domain::{FetchFailure, FollowerPlatform, ProviderResult, YouTubeConfig};
use serde::Deserialize;
use tracing::{info, instrument};

use super::response::{decode_json, endpoint};
use crate::http::HttpClient;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    /// The Data API encodes counts as strings.
    subscriber_count: Option<String>,
}

pub struct YouTubeSubscribers {
    http: HttpClient,
    api_key: String,
    channel_id: String,
    api_base: String,
}

impl YouTubeSubscribers {
    pub fn new(http: HttpClient, config: &YouTubeConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.expose().to_string(),
            channel_id: config.channel_id.clone(),
            api_base: config.api_base.clone().unwrap_or_else(|| YOUTUBE_API_BASE.to_string()),
        }
    }
}

#[async_trait]
impl FollowerProvider for YouTubeSubscribers {
    fn name(&self) -> &str {
        FollowerPlatform::YouTube.as_str()
    }

    #[instrument(skip(self), fields(channel = %self.channel_id))]
    async fn fetch_current_count(&self) -> ProviderResult {
        let request = self.http.get(endpoint(&self.api_base, "youtube/v3/channels")).query(&[
            ("part", "statistics"),
            ("id", self.channel_id.as_str()),
            ("key", self.api_key.as_str()),
        ]);

        let response = self.http.send(request).await.map_err(FetchFailure::from)?;
        let body: ChannelList = decode_json(self.name(), response).await?;

        let raw = body
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchFailure::malformed(format!("youtube: channel {} not found", self.channel_id)))?
            .statistics
            .and_then(|stats| stats.subscriber_count)
            .ok_or_else(|| FetchFailure::malformed("youtube: missing statistics.subscriberCount"))?;
        let count = raw
            .parse::<u64>()
            .map_err(|err| FetchFailure::malformed(format!("youtube: subscriberCount {raw:?}: {err}")))?;
        info!(count, "fetched youtube subscribers");
        Ok(count)
    }
}
