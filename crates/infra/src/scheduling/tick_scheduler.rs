//! Tick scheduler for the `serve` mode.
//!
//! Runs [`TickService::run_tick`] at a fixed interval on a background task.
//! Ticks run inline in the loop, so two ticks never overlap; a tick that
//! overruns the interval causes the missed slots to be skipped rather than
//! bunched up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clout_common::ErrorClassification;
use clout_core::{TickOutcome, TickService};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

#[derive(Debug, Clone)]
pub struct TickSchedulerConfig {
    pub interval: Duration,
    /// Run the first tick as soon as the scheduler starts.
    pub run_immediately: bool,
    /// How long `stop` waits for an in-flight tick.
    pub join_timeout: Duration,
}

impl Default for TickSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1800),
            run_immediately: true,
            join_timeout: Duration::from_secs(60),
        }
    }
}

pub struct TickScheduler {
    service: Arc<TickService>,
    config: TickSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
    ticks_run: Arc<AtomicU64>,
}

impl TickScheduler {
    pub fn new(service: Arc<TickService>, config: TickSchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
            ticks_run: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the background loop.
    ///
    /// # Errors
    /// Returns [`SchedulerError::AlreadyRunning`] if already started.
    #[instrument(skip(self), fields(interval_secs = self.config.interval.as_secs()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Fresh token so the scheduler can restart after stop
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();
        let ticks_run = Arc::clone(&self.ticks_run);

        let handle = tokio::spawn(async move {
            Self::tick_loop(service, config, cancel, ticks_run).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!("Tick scheduler started");
        Ok(())
    }

    /// Cancel the loop and wait for any in-flight tick to finish.
    ///
    /// # Errors
    /// Returns [`SchedulerError::NotRunning`] if not started, or a timeout or
    /// join error if the task does not wind down cleanly.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!(ticks = self.ticks_run(), "Tick scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Ticks completed since construction, successful or not.
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::SeqCst)
    }

    async fn tick_loop(
        service: Arc<TickService>,
        config: TickSchedulerConfig,
        cancel: CancellationToken,
        ticks_run: Arc<AtomicU64>,
    ) {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !config.run_immediately {
            // The first interval tick completes immediately
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Tick loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match service.run_tick().await {
                        Ok(report) => match report.outcome {
                            TickOutcome::Recorded { .. } => {
                                debug!(date = %report.date, "scheduled tick recorded");
                            }
                            TickOutcome::Skipped { reason } => {
                                warn!(date = %report.date, reason = %reason, "scheduled tick skipped");
                            }
                        },
                        Err(err) => {
                            error!(error = %err, severity = %err.severity(), "scheduled tick failed");
                        }
                    }
                    ticks_run.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
}
