//! In-memory job store for tests and single-instance development.
//!
//! Mirrors the repository's lease and retry transitions over a plain
//! vector; no crash survival.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use quadmart_core::result::AppResult;
use quadmart_entity::job::model::{CreateJob, Job};
use quadmart_entity::job::status::JobStatus;

use crate::store::JobStore;

/// Jobs held in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_job<T>(&self, id: Uuid, f: impl FnOnce(&mut Job) -> T) -> Option<T> {
        let mut jobs = self.jobs.lock().expect("job store poisoned");
        jobs.iter_mut().find(|j| j.id == id).map(f)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: data.job_type,
            payload: data.payload.clone(),
            priority: data.priority,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: data.max_attempts,
            run_at: data.run_at,
            lease_expires_at: None,
            worker_id: None,
            result: None,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        };
        self.jobs
            .lock()
            .expect("job store poisoned")
            .push(job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        let jobs = self.jobs.lock().expect("job store poisoned");
        Ok(jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn claim_next(&self, worker_id: &str, lease_seconds: u64) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().expect("job store poisoned");

        let mut best: Option<usize> = None;
        for (i, job) in jobs.iter().enumerate() {
            if job.status != JobStatus::Pending {
                continue;
            }
            if job.run_at.is_some_and(|t| t > now) {
                continue;
            }
            // Strict comparisons keep insertion order on full ties.
            best = match best {
                None => Some(i),
                Some(b) => {
                    let cur = &jobs[b];
                    if job.priority > cur.priority
                        || (job.priority == cur.priority && job.created_at < cur.created_at)
                    {
                        Some(i)
                    } else {
                        Some(b)
                    }
                }
            };
        }

        Ok(best.map(|i| {
            let job = &mut jobs[i];
            job.status = JobStatus::Processing;
            job.worker_id = Some(worker_id.to_string());
            job.started_at = Some(now);
            job.lease_expires_at = Some(now + Duration::seconds(lease_seconds as i64));
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn complete(&self, id: Uuid, result: Option<&Value>) -> AppResult<()> {
        self.with_job(id, |job| {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Completed;
                job.result = result.cloned();
                job.lease_expires_at = None;
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn retry_later(&self, id: Uuid, error: &str, delay_seconds: u64) -> AppResult<()> {
        self.with_job(id, |job| {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Pending;
                job.attempts += 1;
                job.error_message = Some(error.to_string());
                job.run_at = Some(Utc::now() + Duration::seconds(delay_seconds as i64));
                job.lease_expires_at = None;
                job.worker_id = None;
                job.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> AppResult<()> {
        self.with_job(id, |job| {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Failed;
                job.attempts += 1;
                job.error_message = Some(error.to_string());
                job.lease_expires_at = None;
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn cancel_pending(&self, id: Uuid) -> AppResult<bool> {
        Ok(self
            .with_job(id, |job| {
                if job.status == JobStatus::Pending {
                    job.status = JobStatus::Failed;
                    job.error_message = Some("cancelled".to_string());
                    job.completed_at = Some(Utc::now());
                    job.updated_at = Utc::now();
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn requeue_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().expect("job store poisoned");
        let mut requeued = 0;
        for job in jobs.iter_mut() {
            if job.status == JobStatus::Processing
                && job.lease_expires_at.is_some_and(|t| t < now)
            {
                job.status = JobStatus::Pending;
                job.lease_expires_at = None;
                job.worker_id = None;
                job.updated_at = now;
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let jobs = self.jobs.lock().expect("job store poisoned");
        Ok(jobs.iter().filter(|j| j.status == status).count() as i64)
    }

    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().expect("job store poisoned");
        let original = jobs.len();
        jobs.retain(|j| !(j.status.is_terminal() && j.updated_at < before));
        Ok((original - jobs.len()) as u64)
    }
}
