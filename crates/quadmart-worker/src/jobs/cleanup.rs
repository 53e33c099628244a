//! Periodic cleanup job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use quadmart_entity::job::model::Job;
use quadmart_entity::job::status::JobType;

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Handler for [`JobType::Cleanup`] jobs: deletes terminal jobs past the
/// retention window.
pub struct CleanupJobHandler {
    queue: Arc<JobQueue>,
    retention_days: i64,
}

impl CleanupJobHandler {
    /// Create a handler with the configured retention window.
    pub fn new(queue: Arc<JobQueue>, retention_days: i64) -> Self {
        Self {
            queue,
            retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for CleanupJobHandler {
    fn job_type(&self) -> JobType {
        JobType::Cleanup
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let retention_days = retention_override(&job.payload).unwrap_or(self.retention_days);

        let deleted = self
            .queue
            .cleanup_old(retention_days)
            .await
            .map_err(JobExecutionError::Internal)?;

        info!(deleted, retention_days, "Cleanup job finished");
        Ok(Some(json!({ "deleted_jobs": deleted })))
    }
}

/// One-off retention override carried in the payload, if any.
fn retention_override(payload: &Value) -> Option<i64> {
    payload
        .get("retention_days")
        .and_then(Value::as_i64)
        .filter(|days| *days > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_override_parsing() {
        assert_eq!(
            retention_override(&json!({"retention_days": 14})),
            Some(14)
        );
        assert_eq!(retention_override(&json!({})), None);
        assert_eq!(retention_override(&json!({"retention_days": 0})), None);
        assert_eq!(retention_override(&json!({"retention_days": -3})), None);
    }
}
