//! Application context - wires adapters into the core services

use std::sync::Arc;

use clout_common::{Clock, SystemClock};
use clout_core::{CommitSource, DocumentStore, Notifier, SeriesKeys, SeriesReconciler, TickService, TickSettings};
use clout_domain::{AppConfig, CloutError, Result};
use clout_infra::{
    follower_providers, notifier_from_config, DashboardRenderer, GitHubCommitSource, HttpClient,
    LogNotifier, ObjectDocumentStore, TickSchedulerConfig,
};
use tracing::info;

/// Everything a command needs, built once from the loaded config.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<ObjectDocumentStore>,
    pub service: Arc<TickService>,
}

impl AppContext {
    /// # Errors
    /// Returns `CloutError::Config` when no storage backend is configured
    /// outside a dry run, or when an adapter cannot be constructed.
    pub fn new(config: AppConfig, dry_run: bool) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_clock(config, dry_run, clock)
    }

    /// # Errors
    /// See [`AppContext::new`].
    pub fn with_clock(config: AppConfig, dry_run: bool, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Arc::new(build_store(&config, dry_run)?);
        let http = HttpClient::new()?;

        let notifier: Arc<dyn Notifier> = if dry_run {
            Arc::new(LogNotifier)
        } else {
            notifier_from_config(config.notifier.as_ref())?
        };
        let commits: Arc<dyn CommitSource> =
            Arc::new(GitHubCommitSource::new(http.clone(), &config.github));

        let document_store: Arc<dyn DocumentStore> = store.clone();
        let reconciler = SeriesReconciler::new(
            document_store,
            SeriesKeys::from_config(&config.storage),
            Arc::clone(&clock),
        );
        let settings = TickSettings::from_config(&config.schedule, &config.storage)?;

        let mut service = TickService::new(reconciler, commits, notifier, clock, settings)
            .with_renderer(Arc::new(DashboardRenderer::from_config(&config)?));
        for provider in follower_providers(&config, &http) {
            service = service.with_provider(provider);
        }

        info!(dry_run, store = store.label(), "application context ready");
        Ok(Self { config, store, service: Arc::new(service) })
    }

    pub fn scheduler_config(&self) -> TickSchedulerConfig {
        TickSchedulerConfig { interval: self.config.schedule.interval(), ..TickSchedulerConfig::default() }
    }
}

fn build_store(config: &AppConfig, dry_run: bool) -> Result<ObjectDocumentStore> {
    if dry_run {
        return Ok(ObjectDocumentStore::in_memory());
    }
    match &config.storage.backend {
        Some(backend) => ObjectDocumentStore::from_backend(backend),
        None => Err(CloutError::Config(
            "no storage backend configured; set S3_BUCKET or STORAGE_DIR, or pass --dry-run".into(),
        )),
    }
}
