//! # Commits or Clout
//!
//! Process entry for the dashboard updater: command-line parsing, logging
//! setup and wiring of the infrastructure adapters into the core services.

pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;

pub use cli::{Cli, Command, LogFormat};
pub use context::AppContext;
