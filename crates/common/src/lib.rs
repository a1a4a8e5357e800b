//! Small utilities shared across the Commits or Clout crates.
//!
//! - `error`: the [`ErrorClassification`] vocabulary used to decide log
//!   severity and process exit status for failures
//! - `time`: the [`Clock`] abstraction so time-dependent logic can be tested
//!   deterministically

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod time;

pub use error::{ErrorClassification, ErrorSeverity};
pub use time::{Clock, FixedClock, SystemClock};
