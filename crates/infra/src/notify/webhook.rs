//! Slack-style incoming webhook notifier

use std::time::Duration;

use async_trait::async_trait;
use clout_core::Notifier;
use clout_domain::{CloutError, Result};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::http::HttpClient;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": "<context>: <details>"}` once; every failure is swallowed.
pub struct WebhookNotifier {
    http: HttpClient,
    url: Url,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns `CloutError::Config` for an unparseable URL.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|err| CloutError::Config(format!("invalid webhook URL: {err}")))?;
        let http = HttpClient::builder().timeout(WEBHOOK_TIMEOUT).max_attempts(1).build()?;
        Ok(Self { http, url })
    }

    pub fn message(context: &str, details: &str) -> String {
        format!("{context}: {details}")
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_failure(&self, context: &str, details: &str) {
        let text = Self::message(context, details);
        let request = self.http.post(self.url.clone()).json(&WebhookPayload { text: &text });

        match self.http.send(request).await {
            Ok(response) if response.status().is_success() => {
                info!(context, "failure notification delivered");
            }
            Ok(response) => {
                warn!(context, status = %response.status(), "failure notification rejected");
            }
            Err(err) => {
                warn!(context, error = %err, "failure notification not delivered");
            }
        }
    }
}
