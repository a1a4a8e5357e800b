//! # Commits or Clout Domain
//!
//! Business domain types for the commits-vs-followers dashboard.
//!
//! This crate contains:
//! - Snapshots, the historical series and its persisted document
//! - Provider names and fetch failure classification
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
