//! Error conversions for infrastructure adapters

mod conversions;

pub use conversions::{fetch_failure_for_status, InfraError};
