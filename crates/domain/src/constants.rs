//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

/// Schema version written into every persisted series document.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Schema version assigned to documents that predate the version marker.
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

// Storage keys
pub const DEFAULT_HISTORY_KEY: &str = "historical_data.json";
pub const DEFAULT_HISTORY_BACKUP_KEY: &str = "historical_data_backup.json";
pub const DEFAULT_BACKUP_PREFIX: &str = "backups/historical_data";
pub const DEFAULT_PAGE_KEY: &str = "index.html";

/// `strftime` pattern appended to the backup prefix (`<prefix>_<stamp>`).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// Scheduling
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 1800;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DASHBOARD_TIMEZONE: &str = "America/Los_Angeles";

// Content types
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
