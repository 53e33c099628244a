//! Job repository: queue persistence and atomic lease transitions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_entity::job::model::{CreateJob, Job};
use quadmart_entity::job::status::JobStatus;

/// Repository for background job persistence and queue operations.
///
/// All status transitions are single-row conditional updates; the
/// `claim_next` query is the sole concurrency-control mechanism across
/// worker processes.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new pending job.
    pub async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, payload, priority, max_attempts, run_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.job_type)
        .bind(&data.payload)
        .bind(data.priority)
        .bind(data.max_attempts)
        .bind(data.run_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// Atomically claim the next eligible pending job.
    ///
    /// Selects the highest-priority pending job (ties broken by earliest
    /// creation) whose `run_at` has passed, transitions it to processing,
    /// and records a lease expiry. `FOR UPDATE SKIP LOCKED` ensures a job
    /// already claimed by another worker process cannot be claimed twice.
    pub async fn claim_next(&self, worker_id: &str, lease_seconds: u64) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'processing', started_at = NOW(), worker_id = $1, \
             lease_expires_at = NOW() + make_interval(secs => $2), updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE status = 'pending' \
                AND (run_at IS NULL OR run_at <= NOW()) \
                ORDER BY priority DESC, created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(worker_id)
        .bind(lease_seconds as f64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    /// Mark a job as completed.
    pub async fn complete(&self, job_id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, lease_expires_at = NULL, \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    /// Return a failed job to pending with a retry delay.
    ///
    /// Increments the attempt counter; the job becomes eligible again only
    /// once `run_at` passes.
    pub async fn retry_later(
        &self,
        job_id: Uuid,
        error_message: &str,
        delay_seconds: u64,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', attempts = attempts + 1, error_message = $2, \
             run_at = NOW() + make_interval(secs => $3), lease_expires_at = NULL, \
             worker_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(error_message)
        .bind(delay_seconds as f64)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retry job", e))?;
        Ok(())
    }

    /// Mark a job as permanently failed.
    pub async fn fail(&self, job_id: Uuid, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', attempts = attempts + 1, error_message = $2, \
             lease_expires_at = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))?;
        Ok(())
    }

    /// Cancel a pending job by transitioning it directly to failed.
    ///
    /// A job already leased cannot be cancelled mid-flight; returns whether
    /// the cancellation took effect.
    pub async fn cancel_pending(&self, job_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = 'cancelled', \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Requeue processing jobs whose lease has expired.
    ///
    /// Liveness recovery for crashed/stalled workers; deliberately does not
    /// touch the attempt counter.
    pub async fn requeue_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', lease_expires_at = NULL, worker_id = NULL, \
             updated_at = NOW() \
             WHERE status = 'processing' AND lease_expires_at < NOW()",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to requeue expired jobs", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Count jobs in the given status.
    pub async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    /// Delete terminal jobs older than the given cutoff.
    pub async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('completed', 'failed') AND updated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cleanup jobs", e))?;
        Ok(result.rows_affected())
    }
}
