//! Interval scheduling for long-running deployments

pub mod error;
mod tick_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use tick_scheduler::{TickScheduler, TickSchedulerConfig};
