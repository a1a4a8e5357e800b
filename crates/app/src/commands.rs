//! Subcommand handlers

use std::collections::BTreeMap;
use std::process::ExitCode;

use clout_common::ErrorClassification;
use clout_core::TickOutcome;
use clout_domain::AppConfig;
use clout_infra::{config, TickScheduler};
use tracing::{error, info, warn};

use crate::cli::{Cli, Command};
use crate::context::AppContext;

/// Load configuration the way the CLI asks for it.
///
/// # Errors
/// Propagates loader and validation failures.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    config::load_dotenv();
    let config = match &cli.config {
        Some(path) => config::load_from_file(Some(path.clone()))?,
        None => config::load()?,
    };
    Ok(config)
}

/// Dispatch `cli.command`; the exit code reflects tick success.
///
/// # Errors
/// Returns setup failures (config, adapters, scheduler lifecycle).
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;
    let ctx = AppContext::new(config, cli.dry_run)?;

    match cli.command {
        Command::Tick => Ok(tick(&ctx).await),
        Command::Serve => serve(&ctx).await,
        Command::Render => {
            let source = ctx.service.republish().await?;
            info!(source = source.as_str(), "dashboard re-rendered");
            Ok(ExitCode::SUCCESS)
        }
        Command::Backfill { since, until, followers } => {
            let followers: BTreeMap<String, u64> = followers.into_iter().collect();
            let report = ctx.service.backfill(since, until, &followers).await?;
            info!(
                since = %report.since,
                until = %report.until,
                inserted = report.inserted,
                replaced = report.replaced,
                backup_failures = report.save.backup_failures.len(),
                "backfill finished"
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One tick: success or skip exits 0, a fatal error exits 1.
pub async fn tick(ctx: &AppContext) -> ExitCode {
    match ctx.service.run_tick().await {
        Ok(report) => {
            match &report.outcome {
                TickOutcome::Recorded { snapshot, effect, backup_failures, .. } => info!(
                    date = %report.date,
                    commits = snapshot.commit_count(),
                    followers = snapshot.total_followers(),
                    effect = ?effect,
                    backup_failures = backup_failures.len(),
                    page_published = report.page_published,
                    "tick recorded"
                ),
                TickOutcome::Skipped { reason } => {
                    warn!(date = %report.date, reason = %reason, "tick skipped");
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, severity = %err.severity(), "tick failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    let mut scheduler = TickScheduler::new(ctx.service.clone(), ctx.scheduler_config());
    scheduler.start().await?;
    info!(interval_secs = ctx.config.schedule.interval_seconds, "serving; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    scheduler.stop().await?;
    Ok(ExitCode::SUCCESS)
}
