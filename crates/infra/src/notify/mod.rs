//! Failure notifiers

mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use clout_core::Notifier;
use clout_domain::{NotifierConfig, Result};
use tracing::error;

pub use webhook::WebhookNotifier;

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_failure(&self, context: &str, details: &str) {
        error!(context, details, "failure notification");
    }
}

/// Webhook notifier when configured, otherwise [`LogNotifier`].
///
/// # Errors
/// Fails if the webhook URL is invalid.
pub fn notifier_from_config(config: Option<&NotifierConfig>) -> Result<Arc<dyn Notifier>> {
    match config {
        Some(config) => Ok(Arc::new(WebhookNotifier::new(config.webhook_url.expose())?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
