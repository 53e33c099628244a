//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobStatus, JobType};

/// A unit of deferred work.
///
/// Invariant: at most one worker holds an active lease on a given job at a
/// time; a job whose lease has expired without completion is eligible for
/// re-leasing. Retained after completion/failure for inspection, subject
/// to the cleanup job's retention policy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Type of work.
    pub job_type: JobType,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Priority; higher runs sooner, ties broken by creation time.
    pub priority: i32,
    /// Current job status.
    pub status: JobStatus,
    /// Number of failed execution attempts so far.
    pub attempts: i32,
    /// Maximum allowed attempts before permanent failure.
    pub max_attempts: i32,
    /// Earliest time the job is eligible to run (retry backoff).
    pub run_at: Option<DateTime<Utc>>,
    /// Lease expiry; set while processing.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Worker that holds (or last held) the lease.
    pub worker_id: Option<String>,
    /// Result data on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Last error message.
    pub error_message: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job last started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether another failed attempt would still leave retries available.
    pub fn can_retry(&self) -> bool {
        self.attempts + 1 < self.max_attempts
    }
}

/// Data required to enqueue a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Type of work.
    pub job_type: JobType,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Priority; higher runs sooner.
    pub priority: i32,
    /// Maximum attempts before permanent failure.
    pub max_attempts: i32,
    /// Earliest eligible run time (None = immediate).
    pub run_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(attempts: i32, max_attempts: i32) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: JobType::ImageProcess,
            payload: serde_json::json!({}),
            priority: 0,
            status: JobStatus::Processing,
            attempts,
            max_attempts,
            run_at: None,
            lease_expires_at: None,
            worker_id: None,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_retry_below_ceiling() {
        assert!(job(0, 3).can_retry());
        assert!(job(1, 3).can_retry());
        assert!(!job(2, 3).can_retry());
        assert!(!job(5, 3).can_retry());
    }
}
