//! Job persistence trait behind the durable queue.
//!
//! The queue and runner depend on this seam rather than on the concrete
//! repository, so the lease and retry semantics are testable without a
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use quadmart_core::result::AppResult;
use quadmart_database::repositories::job::JobRepository;
use quadmart_entity::job::model::{CreateJob, Job};
use quadmart_entity::job::status::JobStatus;

/// Persistence operations of the durable job queue.
///
/// Implemented by the PostgreSQL repository and by an in-memory store for
/// tests and single-instance development.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new pending job.
    async fn create(&self, data: &CreateJob) -> AppResult<Job>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Atomically claim the next eligible pending job: highest priority
    /// first, ties broken by earliest creation, `run_at` already passed.
    async fn claim_next(&self, worker_id: &str, lease_seconds: u64) -> AppResult<Option<Job>>;

    /// Mark a job completed, storing its result.
    async fn complete(&self, id: Uuid, result: Option<&Value>) -> AppResult<()>;

    /// Return a processing job to pending with an incremented attempt
    /// counter and a retry delay.
    async fn retry_later(&self, id: Uuid, error: &str, delay_seconds: u64) -> AppResult<()>;

    /// Mark a processing job permanently failed, incrementing attempts.
    async fn fail(&self, id: Uuid, error: &str) -> AppResult<()>;

    /// Cancel a job that is still pending. Returns whether it took effect.
    async fn cancel_pending(&self, id: Uuid) -> AppResult<bool>;

    /// Return processing jobs with expired leases to pending, without
    /// touching the attempt counter.
    async fn requeue_expired(&self) -> AppResult<u64>;

    /// Count jobs in the given status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;

    /// Delete terminal jobs last updated before the cutoff.
    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        JobRepository::create(self, data).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        JobRepository::find_by_id(self, id).await
    }

    async fn claim_next(&self, worker_id: &str, lease_seconds: u64) -> AppResult<Option<Job>> {
        JobRepository::claim_next(self, worker_id, lease_seconds).await
    }

    async fn complete(&self, id: Uuid, result: Option<&Value>) -> AppResult<()> {
        JobRepository::complete(self, id, result).await
    }

    async fn retry_later(&self, id: Uuid, error: &str, delay_seconds: u64) -> AppResult<()> {
        JobRepository::retry_later(self, id, error, delay_seconds).await
    }

    async fn fail(&self, id: Uuid, error: &str) -> AppResult<()> {
        JobRepository::fail(self, id, error).await
    }

    async fn cancel_pending(&self, id: Uuid) -> AppResult<bool> {
        JobRepository::cancel_pending(self, id).await
    }

    async fn requeue_expired(&self) -> AppResult<u64> {
        JobRepository::requeue_expired(self).await
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        JobRepository::count_by_status(self, status).await
    }

    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        JobRepository::cleanup_old(self, before).await
    }
}
