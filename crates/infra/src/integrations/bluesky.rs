//! Bluesky follower count
//!
//! Logs in with an app password on every fetch, then reads the profile.

use async_trait::async_trait;
use clout_core::FollowerProvider;
use clout_domain::{BlueskyConfig, FetchFailure, FollowerPlatform, ProviderResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::response::{decode_json, endpoint};
use crate::http::HttpClient;

pub const BLUESKY_API_BASE: &str = "https://bsky.social";

#[derive(Debug, Serialize)]
struct CreateSession<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    followers_count: Option<u64>,
}

pub struct BlueskyFollowers {
    http: HttpClient,
    identifier: String,
    app_password: String,
    actor: String,
    api_base: String,
}

impl BlueskyFollowers {
    pub fn new(http: HttpClient, config: &BlueskyConfig) -> Self {
        Self {
            http,
            identifier: config.identifier.clone(),
            app_password: config.app_password.expose().to_string(),
            actor: config.actor().to_string(),
            api_base: config.api_base.clone().unwrap_or_else(|| BLUESKY_API_BASE.to_string()),
        }
    }

    async fn create_session(&self) -> Result<Session, FetchFailure> {
        let request = self
            .http
            .post(endpoint(&self.api_base, "xrpc/com.atproto.server.createSession"))
            .json(&CreateSession { identifier: &self.identifier, password: &self.app_password });
        let response = self.http.send(request).await.map_err(FetchFailure::from)?;
        let session = decode_json(self.name(), response).await?;
        debug!("created bluesky session");
        Ok(session)
    }
}

#[async_trait]
impl FollowerProvider for BlueskyFollowers {
    fn name(&self) -> &str {
        FollowerPlatform::Bluesky.as_str()
    }

    #[instrument(skip(self), fields(actor = %self.actor))]
    async fn fetch_current_count(&self) -> ProviderResult {
        let session = self.create_session().await?;

        let request = self
            .http
            .get(endpoint(&self.api_base, "xrpc/app.bsky.actor.getProfile"))
            .bearer_auth(&session.access_jwt)
            .query(&[("actor", self.actor.as_str())]);
        let response = self.http.send(request).await.map_err(FetchFailure::from)?;
        let profile: Profile = decode_json(self.name(), response).await?;

        let count = profile
            .followers_count
            .ok_or_else(|| FetchFailure::malformed("bluesky: profile has no followersCount"))?;
        info!(count, "fetched bluesky followers");
        Ok(count)
    }
}
