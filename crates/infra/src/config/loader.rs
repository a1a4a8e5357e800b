//! Configuration loader
//!
//! Builds the single [`AppConfig`] from environment variables or a file.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory is loaded if present
//! 2. Environment variables are tried first
//! 3. If a required variable is missing, falls back to a config file
//! 4. Config files may be JSON or TOML
//!
//! ## Environment Variables
//! - `GITHUB_TOKEN`, `GITHUB_USERNAME` (required), `GITHUB_ORGANIZATION`
//! - `TWITTER_BEARER_TOKEN` + `TWITTER_USERNAME`
//! - `YOUTUBE_API_KEY` + `YOUTUBE_CHANNEL_ID`
//! - `BLUESKY_API_KEY` (`identifier:app-password`), `BLUESKY_HANDLE`
//! - `S3_BUCKET` + `AWS_REGION`, or `STORAGE_DIR`
//! - `S3_HISTORY_KEY`, `S3_HISTORY_BACKUP_KEY`, `HISTORY_BACKUP_PREFIX`, `S3_KEY`
//! - `NOTIFY_WEBHOOK_URL`
//! - `TICK_INTERVAL_SECS`, `PROVIDER_TIMEOUT_SECS`, `DASHBOARD_TIMEZONE`,
//!   `COMMIT_ANCHOR_YEAR`
//!
//! A follower provider whose variables are only partly set is left
//! unconfigured and logged at `warn`.
//!
//! ## File Locations
//! The loader probes, in order, `clout.toml`, `clout.json`, `config.toml`
//! and `config.json` in the working directory, then the same names next to
//! the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clout_domain::{
    AppConfig, BlueskyConfig, CloutError, GitHubConfig, NotifierConfig, Result, ScheduleConfig,
    Secret, StorageBackend, StorageConfig, TwitterConfig, YouTubeConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["clout.toml", "clout.json", "config.toml", "config.json"];

/// Load `.env` into the process environment, if one exists.
///
/// Variables already set in the environment take precedence.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
    }
}

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CloutError::Config` if neither source yields a valid config.
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `CloutError::Config` if required variables are missing or a
/// value is malformed.
pub fn load_from_env() -> Result<AppConfig> {
    config_from_vars(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable lookup.
///
/// Empty values are treated as unset.
///
/// # Errors
/// Returns `CloutError::Config` on missing required variables, malformed
/// numbers, or a failed [`AppConfig::validate`].
pub fn config_from_vars<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |key: &str| {
        var(key).ok_or_else(|| {
            CloutError::Config(format!("Missing required environment variable: {key}"))
        })
    };

    let github = GitHubConfig {
        token: Secret::new(required("GITHUB_TOKEN")?),
        username: required("GITHUB_USERNAME")?,
        organization: var("GITHUB_ORGANIZATION"),
        api_base: None,
    };

    let twitter = match (var("TWITTER_BEARER_TOKEN"), var("TWITTER_USERNAME")) {
        (Some(token), Some(username)) => {
            Some(TwitterConfig { bearer_token: Secret::new(token), username, api_base: None })
        }
        (None, None) => None,
        _ => {
            tracing::warn!("TWITTER_BEARER_TOKEN and TWITTER_USERNAME must both be set; skipping");
            None
        }
    };

    let youtube = match (var("YOUTUBE_API_KEY"), var("YOUTUBE_CHANNEL_ID")) {
        (Some(key), Some(channel_id)) => {
            Some(YouTubeConfig { api_key: Secret::new(key), channel_id, api_base: None })
        }
        (None, None) => None,
        _ => {
            tracing::warn!("YOUTUBE_API_KEY and YOUTUBE_CHANNEL_ID must both be set; skipping");
            None
        }
    };

    let bluesky = var("BLUESKY_API_KEY").and_then(|raw| match split_bluesky_key(&raw) {
        Some((identifier, password)) => Some(BlueskyConfig {
            identifier,
            app_password: Secret::new(password),
            handle: var("BLUESKY_HANDLE"),
            api_base: None,
        }),
        None => {
            tracing::warn!("BLUESKY_API_KEY must look like identifier:app-password; skipping");
            None
        }
    });

    let backend = if let Some(bucket) = var("S3_BUCKET") {
        Some(StorageBackend::S3 { bucket, region: var("AWS_REGION") })
    } else {
        var("STORAGE_DIR").map(|root| StorageBackend::Local { root: PathBuf::from(root) })
    };

    let defaults = StorageConfig::default();
    let storage = StorageConfig {
        backend,
        history_key: var("S3_HISTORY_KEY").unwrap_or(defaults.history_key),
        backup_key: var("S3_HISTORY_BACKUP_KEY").unwrap_or(defaults.backup_key),
        backup_prefix: var("HISTORY_BACKUP_PREFIX").unwrap_or(defaults.backup_prefix),
        page_key: var("S3_KEY").unwrap_or(defaults.page_key),
    };

    let notifier =
        var("NOTIFY_WEBHOOK_URL").map(|url| NotifierConfig { webhook_url: Secret::new(url) });

    let defaults = ScheduleConfig::default();
    let schedule = ScheduleConfig {
        interval_seconds: parse_var(var("TICK_INTERVAL_SECS"), "TICK_INTERVAL_SECS")?
            .unwrap_or(defaults.interval_seconds),
        provider_timeout_seconds: parse_var(var("PROVIDER_TIMEOUT_SECS"), "PROVIDER_TIMEOUT_SECS")?
            .unwrap_or(defaults.provider_timeout_seconds),
        timezone: var("DASHBOARD_TIMEZONE").unwrap_or(defaults.timezone),
        commit_anchor_year: parse_var(var("COMMIT_ANCHOR_YEAR"), "COMMIT_ANCHOR_YEAR")?,
    };

    let config = AppConfig { github, twitter, youtube, bluesky, storage, notifier, schedule };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `CloutError::Config` if the file is missing, unreadable,
/// malformed, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CloutError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CloutError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CloutError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `CloutError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CloutError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CloutError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CloutError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// `identifier:app-password`; the password itself may contain colons.
fn split_bluesky_key(raw: &str) -> Option<(String, String)> {
    let (identifier, password) = raw.split_once(':')?;
    let (identifier, password) = (identifier.trim(), password.trim());
    if identifier.is_empty() || password.is_empty() {
        return None;
    }
    Some((identifier.to_string(), password.to_string()))
}

fn parse_var<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| CloutError::Config(format!("Invalid {key} '{raw}': {e}")))
        })
        .transpose()
}
