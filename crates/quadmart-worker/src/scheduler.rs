//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use quadmart_core::error::AppError;
use quadmart_core::result::AppResult;
use quadmart_entity::job::model::CreateJob;
use quadmart_entity::job::status::JobType;
use quadmart_moderation::EnforcementEngine;

use crate::queue::JobQueue;

/// Number of violation ledgers examined per decay sweep.
const DECAY_SWEEP_LIMIT: i64 = 500;

/// Cron-based scheduler for periodic maintenance.
///
/// Lease recovery and strike decay run directly on a schedule; job
/// cleanup goes through the queue so its outcome is recorded like any
/// other job.
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
    enforcement: Arc<EnforcementEngine>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(queue: Arc<JobQueue>, enforcement: Arc<EnforcementEngine>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            queue,
            enforcement,
        })
    }

    /// Register all default scheduled tasks.
    pub async fn register_default_tasks(&self) -> AppResult<()> {
        self.register_lease_sweep().await?;
        self.register_strike_decay().await?;
        self.register_job_cleanup().await?;

        info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shut down the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }

    /// Lease sweep: every minute, return expired leases to pending.
    async fn register_lease_sweep(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async("0 * * * * *", move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                debug!("Running lease sweep");
                if let Err(e) = queue.requeue_expired().await {
                    error!("Lease sweep failed: {e}");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create lease_sweep schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add lease_sweep schedule: {e}")))?;

        info!("Registered: lease_sweep (every minute)");
        Ok(())
    }

    /// Strike decay: daily at 04:00, reward clean users.
    async fn register_strike_decay(&self) -> AppResult<()> {
        let enforcement = Arc::clone(&self.enforcement);
        let job = CronJob::new_async("0 0 4 * * *", move |_uuid, _lock| {
            let enforcement = Arc::clone(&enforcement);
            Box::pin(async move {
                debug!("Running strike decay sweep");
                match enforcement.run_decay_sweep(DECAY_SWEEP_LIMIT).await {
                    Ok(reduced) => {
                        if reduced > 0 {
                            info!(reduced, "Strike decay sweep reduced strikes");
                        }
                    }
                    Err(e) => error!("Strike decay sweep failed: {e}"),
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create strike_decay schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add strike_decay schedule: {e}")))?;

        info!("Registered: strike_decay (daily 04:00)");
        Ok(())
    }

    /// Job cleanup: daily at 03:00, enqueue a cleanup job.
    async fn register_job_cleanup(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async("0 0 3 * * *", move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                debug!("Scheduling cleanup job");
                let data = CreateJob {
                    job_type: JobType::Cleanup,
                    payload: serde_json::json!({}),
                    priority: -10,
                    max_attempts: 1,
                    run_at: None,
                };
                if let Err(e) = queue.enqueue(data).await {
                    error!("Failed to enqueue cleanup job: {e}");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create cleanup schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add cleanup schedule: {e}")))?;

        info!("Registered: cleanup (daily 03:00)");
        Ok(())
    }
}
