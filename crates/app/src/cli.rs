//! Command-line interface

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "commits-or-clout", version, about = "Commits vs. followers dashboard updater")]
pub struct Cli {
    /// Config file (TOML or JSON); skips environment-variable loading.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Use an in-memory store and log-only notifications.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run a single tick and exit.
    Tick,
    /// Run ticks on the configured interval until Ctrl-C.
    Serve,
    /// Re-render the dashboard from the stored series.
    Render,
    /// Rebuild history from daily commit counts.
    Backfill {
        #[arg(long, value_name = "YYYY-MM-DD")]
        since: NaiveDate,
        /// Defaults to today in the dashboard timezone.
        #[arg(long, value_name = "YYYY-MM-DD")]
        until: Option<NaiveDate>,
        /// Follower count applied to every backfilled day, e.g. `twitter=120`.
        #[arg(long = "followers", value_name = "NAME=COUNT", value_parser = parse_follower, num_args = 1..)]
        followers: Vec<(String, u64)>,
    },
}

fn parse_follower(raw: &str) -> Result<(String, u64), String> {
    let (name, count) =
        raw.split_once('=').ok_or_else(|| format!("expected NAME=COUNT, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing provider name in '{raw}'"));
    }
    let count = count.trim().parse::<u64>().map_err(|e| format!("invalid count in '{raw}': {e}"))?;
    Ok((name.to_ascii_lowercase(), count))
}
