//! Quadmart moderation pipeline server.
//!
//! Entry point that wires the crates together: database, storage,
//! moderation service, enforcement, the durable worker, and the cron
//! scheduler.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use quadmart_core::config::AppConfig;
use quadmart_core::error::AppError;
use quadmart_database::repositories::audit::AuditLogRepository;
use quadmart_database::repositories::job::JobRepository;
use quadmart_database::repositories::moderation::ModerationRepository;
use quadmart_database::repositories::violation::ViolationRepository;
use quadmart_database::DatabasePool;
use quadmart_imaging::ImagePreprocessor;
use quadmart_moderation::{
    build_providers, DecisionThresholds, EnforcementEngine, ModerationService, PipelineContext,
};
use quadmart_storage::build_object_store;
use quadmart_worker::jobs::{
    CleanupJobHandler, EmailJobHandler, ImageProcessJobHandler, LogEmailSender,
};
use quadmart_worker::{CronScheduler, JobExecutor, JobQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("QUADMART_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Pipeline server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing from the logging configuration.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Quadmart pipeline v{}", env!("CARGO_PKG_VERSION"));

    // Database connection + migrations.
    let db = DatabasePool::connect(&config.database).await?;
    quadmart_database::migration::run_migrations(db.pool()).await?;

    // Repositories.
    let moderation_repo = Arc::new(ModerationRepository::new(db.pool().clone()));
    let violation_repo = Arc::new(ViolationRepository::new(db.pool().clone()));
    let audit_repo = Arc::new(AuditLogRepository::new(db.pool().clone()));
    let job_repo = Arc::new(JobRepository::new(db.pool().clone()));

    // Permanent object storage.
    let store = build_object_store(&config.storage).await?;
    tracing::info!(provider = store.provider_type(), "Object storage ready");

    // Moderation pipeline.
    let providers = build_providers(&config.moderation)?;
    tracing::info!(providers = providers.len(), "Moderation providers built");

    let enforcement = Arc::new(EnforcementEngine::new(
        config.enforcement.clone(),
        violation_repo,
        audit_repo.clone(),
    ));
    let service = Arc::new(ModerationService::new(
        providers,
        DecisionThresholds::from_config(&config.moderation),
        ImagePreprocessor::new(config.imaging.clone()),
        moderation_repo,
        enforcement.clone(),
        audit_repo,
        config.moderation.report_flag_threshold,
    ));

    let context = PipelineContext::default();

    // Durable queue + worker.
    let worker_id = format!("worker-{}", Uuid::new_v4());
    let queue = Arc::new(JobQueue::new(job_repo, worker_id));

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ImageProcessJobHandler::new(
        service.clone(),
        store,
        context.clone(),
        &config.imaging,
    )?));
    executor.register(Arc::new(EmailJobHandler::new(Arc::new(LogEmailSender))));
    executor.register(Arc::new(CleanupJobHandler::new(
        queue.clone(),
        config.worker.completed_retention_days,
    )));
    let executor = Arc::new(executor);

    // Scheduled maintenance.
    let mut scheduler = CronScheduler::new(queue.clone(), enforcement).await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;

    // Log moderation outcomes as they happen.
    let mut events = context.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(record_id = %event.record_id(), ?event, "Moderation outcome");
        }
    });

    // Worker loop with graceful shutdown.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let runner_handle = if config.worker.enabled {
        let runner = WorkerRunner::new(queue, executor, config.worker.clone());
        Some(tokio::spawn(async move { runner.run(cancel_rx).await }))
    } else {
        tracing::warn!("Worker disabled by configuration");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;
    tracing::info!("Shutdown signal received");

    let _ = cancel_tx.send(true);
    scheduler.shutdown().await?;
    if let Some(handle) = runner_handle {
        let _ = handle.await;
    }

    tracing::info!("Quadmart pipeline stopped");
    Ok(())
}
