//! Durable job queue over the job store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info};
use uuid::Uuid;

use quadmart_core::result::AppResult;
use quadmart_entity::job::model::{CreateJob, Job};
use quadmart_entity::job::status::JobStatus;

use crate::store::JobStore;

/// Operational counters for the durable queue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    /// Jobs waiting to be claimed.
    pub queue_size: i64,
    /// Jobs currently held under a lease.
    pub processing: i64,
    /// Jobs that failed permanently.
    pub failed: i64,
    /// Jobs executed concurrently per worker; always one.
    pub concurrency: usize,
    /// Identifier of this worker process.
    pub worker_id: String,
}

/// Durable job queue shared by the enqueue side and the worker runner.
///
/// All queue state lives in the job store; this type adds the worker
/// identity and an in-process wakeup so a local enqueue is picked up
/// without waiting out the poll interval.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    worker_id: String,
    wake: Notify,
}

impl JobQueue {
    /// Create a queue bound to the given worker identity.
    pub fn new(store: Arc<dyn JobStore>, worker_id: String) -> Self {
        Self {
            store,
            worker_id,
            wake: Notify::new(),
        }
    }

    /// This worker's identifier.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a job and wake the local runner.
    pub async fn enqueue(&self, data: CreateJob) -> AppResult<Job> {
        let job = self.store.create(&data).await?;
        debug!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");
        self.wake.notify_one();
        Ok(job)
    }

    /// Wait until a local enqueue signals new work.
    pub async fn notified(&self) {
        self.wake.notified().await;
    }

    /// Claim the next eligible job under a lease of `lease_seconds`.
    pub async fn claim_next(&self, lease_seconds: u64) -> AppResult<Option<Job>> {
        self.store.claim_next(&self.worker_id, lease_seconds).await
    }

    /// Mark a job completed, storing its result.
    pub async fn complete(&self, id: Uuid, result: Option<&Value>) -> AppResult<()> {
        self.store.complete(id, result).await
    }

    /// Return a job to pending for retry after `delay_seconds`.
    pub async fn retry_later(&self, id: Uuid, error: &str, delay_seconds: u64) -> AppResult<()> {
        self.store.retry_later(id, error, delay_seconds).await
    }

    /// Mark a job permanently failed.
    pub async fn fail(&self, id: Uuid, error: &str) -> AppResult<()> {
        self.store.fail(id, error).await
    }

    /// Cancel a job that has not been claimed yet. Returns whether a
    /// pending job was actually cancelled.
    pub async fn cancel_pending(&self, id: Uuid) -> AppResult<bool> {
        self.store.cancel_pending(id).await
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        self.store.find_by_id(id).await
    }

    /// Return jobs whose lease expired without completion to pending.
    ///
    /// Lease expiry means the holding worker died or stalled; the job
    /// never ran to a verdict, so this does not count as an attempt.
    pub async fn requeue_expired(&self) -> AppResult<u64> {
        let requeued = self.store.requeue_expired().await?;
        if requeued > 0 {
            info!(requeued, "Requeued jobs with expired leases");
        }
        Ok(requeued)
    }

    /// Delete terminal jobs older than `retention_days`.
    pub async fn cleanup_old(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let deleted = self.store.cleanup_old(cutoff).await?;
        if deleted > 0 {
            info!(deleted, retention_days, "Deleted old terminal jobs");
        }
        Ok(deleted)
    }

    /// Operational counters.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            queue_size: self.store.count_by_status(JobStatus::Pending).await?,
            processing: self.store.count_by_status(JobStatus::Processing).await?,
            failed: self.store.count_by_status(JobStatus::Failed).await?,
            concurrency: 1,
            worker_id: self.worker_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quadmart_entity::job::status::JobType;

    use crate::memory::InMemoryJobStore;

    fn queue() -> JobQueue {
        JobQueue::new(Arc::new(InMemoryJobStore::new()), "worker-test".to_string())
    }

    async fn enqueue_with_priority(queue: &JobQueue, priority: i32) -> Job {
        queue
            .enqueue(CreateJob {
                job_type: JobType::EmailSend,
                payload: serde_json::json!({ "priority": priority }),
                priority,
                max_attempts: 3,
                run_at: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_claims_by_priority_then_creation_order() {
        let queue = queue();
        for priority in [1, 5, 3, 5, 2] {
            enqueue_with_priority(&queue, priority).await;
        }

        let mut claimed = Vec::new();
        while let Some(job) = queue.claim_next(60).await.unwrap() {
            claimed.push(job.priority);
            queue.complete(job.id, None).await.unwrap();
        }
        assert_eq!(claimed, vec![5, 5, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_equal_priority_ties_claim_oldest_first() {
        let queue = queue();
        let first = enqueue_with_priority(&queue, 5).await;
        let second = enqueue_with_priority(&queue, 5).await;

        let claimed = queue.claim_next(60).await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        queue.complete(claimed.id, None).await.unwrap();

        let claimed = queue.claim_next(60).await.unwrap().unwrap();
        assert_eq!(claimed.id, second.id);
    }

    #[tokio::test]
    async fn test_expired_lease_requeued_exactly_once_without_attempt() {
        let queue = queue();
        let job = enqueue_with_priority(&queue, 0).await;

        // Zero-second lease: expired as soon as the claim lands.
        let claimed = queue.claim_next(0).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(queue.stats().await.unwrap().processing, 1);

        assert_eq!(queue.requeue_expired().await.unwrap(), 1);
        assert_eq!(queue.requeue_expired().await.unwrap(), 0);

        let recovered = queue.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(recovered.status, JobStatus::Pending);
        assert_eq!(recovered.attempts, 0);
        assert!(recovered.worker_id.is_none());

        // The recovered job is claimable again.
        let reclaimed = queue.claim_next(60).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, job.id);
    }

    #[tokio::test]
    async fn test_active_lease_is_not_requeued() {
        let queue = queue();
        enqueue_with_priority(&queue, 0).await;
        queue.claim_next(300).await.unwrap().unwrap();

        assert_eq!(queue.requeue_expired().await.unwrap(), 0);
        assert!(queue.claim_next(300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_job_is_never_leased_again() {
        let queue = queue();
        let job = enqueue_with_priority(&queue, 0).await;

        let claimed = queue.claim_next(60).await.unwrap().unwrap();
        queue.fail(claimed.id, "handler exploded").await.unwrap();

        let failed = queue.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.attempts, 1);

        assert!(queue.claim_next(60).await.unwrap().is_none());
        // A lease sweep must not resurrect it either.
        queue.requeue_expired().await.unwrap();
        assert!(queue.claim_next(60).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_delay_defers_eligibility() {
        let queue = queue();
        let job = enqueue_with_priority(&queue, 0).await;

        let claimed = queue.claim_next(60).await.unwrap().unwrap();
        queue
            .retry_later(claimed.id, "transient", 3600)
            .await
            .unwrap();

        let retried = queue.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.attempts, 1);
        assert!(queue.claim_next(60).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_only_touches_pending_jobs() {
        let queue = queue();
        let pending = enqueue_with_priority(&queue, 0).await;
        assert!(queue.cancel_pending(pending.id).await.unwrap());

        let processing = enqueue_with_priority(&queue, 0).await;
        queue.claim_next(60).await.unwrap().unwrap();
        assert!(!queue.cancel_pending(processing.id).await.unwrap());
    }
}
