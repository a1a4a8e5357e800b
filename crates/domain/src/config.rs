//! Configuration structures
//!
//! A single [`AppConfig`] is built once at process start (see
//! `clout_infra::config`) and handed to every component that needs it.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKUP_PREFIX, DEFAULT_DASHBOARD_TIMEZONE, DEFAULT_HISTORY_BACKUP_KEY,
    DEFAULT_HISTORY_KEY, DEFAULT_PAGE_KEY, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_TICK_INTERVAL_SECS,
};
use crate::errors::{CloutError, Result};

/// Credential string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub github: GitHubConfig,
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    #[serde(default)]
    pub bluesky: Option<BlueskyConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `CloutError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.github.username.trim().is_empty() {
            return Err(CloutError::Config("github.username must not be empty".into()));
        }
        if self.github.token.is_empty() {
            return Err(CloutError::Config("github.token must not be empty".into()));
        }
        if self.schedule.interval_seconds == 0 {
            return Err(CloutError::Config("schedule.interval_seconds must be positive".into()));
        }
        if self.schedule.provider_timeout_seconds == 0 {
            return Err(CloutError::Config(
                "schedule.provider_timeout_seconds must be positive".into(),
            ));
        }
        self.schedule.timezone()?;
        if self.storage.history_key == self.storage.backup_key {
            return Err(CloutError::Config(
                "storage.history_key and storage.backup_key must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Commit-hosting provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub token: Secret,
    pub username: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub bearer_token: Secret,
    pub username: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: Secret,
    pub channel_id: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// Login identifier (handle or email).
    pub identifier: String,
    pub app_password: Secret,
    /// Profile to read; defaults to `identifier`.
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl BlueskyConfig {
    pub fn actor(&self) -> &str {
        self.handle.as_deref().unwrap_or(&self.identifier)
    }
}

/// Where the series document and the rendered page live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
    },
    Local {
        root: PathBuf,
    },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `None` means unconfigured; only acceptable for dry runs.
    #[serde(default)]
    pub backend: Option<StorageBackend>,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    #[serde(default = "default_backup_key")]
    pub backup_key: String,
    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,
    #[serde(default = "default_page_key")]
    pub page_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: None,
            history_key: default_history_key(),
            backup_key: default_backup_key(),
            backup_prefix: default_backup_prefix(),
            page_key: default_page_key(),
        }
    }
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

fn default_backup_key() -> String {
    DEFAULT_HISTORY_BACKUP_KEY.to_string()
}

fn default_backup_prefix() -> String {
    DEFAULT_BACKUP_PREFIX.to_string()
}

fn default_page_key() -> String {
    DEFAULT_PAGE_KEY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Webhook URLs usually embed a token, so they are treated as secrets.
    pub webhook_url: Secret,
}

/// Tick cadence and time handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
    /// IANA zone used for the snapshot date and page timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Year whose January 1st anchors the commit count; current year if unset.
    #[serde(default)]
    pub commit_anchor_year: Option<i32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            provider_timeout_seconds: default_provider_timeout(),
            timezone: default_timezone(),
            commit_anchor_year: None,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_seconds)
    }

    /// # Errors
    /// Returns `CloutError::Config` if the zone name is not a known IANA zone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| CloutError::Config(format!("unknown timezone: {}", self.timezone)))
    }
}

fn default_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_SECS
}

fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

fn default_timezone() -> String {
    DEFAULT_DASHBOARD_TIMEZONE.to_string()
}
