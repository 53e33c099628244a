//! Job executor: dispatches claimed jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use quadmart_core::error::AppError;
use quadmart_entity::job::model::Job;
use quadmart_entity::job::status::JobType;

/// Trait for job handler implementations.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    /// Execute the job.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
///
/// The variant decides the job's fate: transient failures retry with
/// backoff while attempts remain, permanent failures fail immediately.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// May retry.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Classified by [`AppError::is_transient`].
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether this failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Permanent(_) => false,
            Self::Transient(_) => true,
            Self::Internal(e) => e.is_transient(),
        }
    }
}

/// Dispatches jobs to the handler registered for their type.
#[derive(Default)]
pub struct JobExecutor {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type();
        info!(%job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to its handler.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        handler.execute(job).await
    }

    /// Whether a handler is registered for the given type.
    pub fn has_handler(&self, job_type: JobType) -> bool {
        self.handlers.contains_key(&job_type)
    }

    /// Registered job types.
    pub fn registered_types(&self) -> Vec<JobType> {
        self.handlers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use quadmart_core::error::ErrorKind;
    use quadmart_entity::job::status::JobStatus;

    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn job_type(&self) -> JobType {
            JobType::EmailSend
        }

        async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
            Ok(Some(job.payload.clone()))
        }
    }

    fn job(job_type: JobType) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type,
            payload: serde_json::json!({"k": "v"}),
            priority: 0,
            status: JobStatus::Processing,
            attempts: 0,
            max_attempts: 3,
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

    #[tokio::test]
    async fn test_dispatches_to_registered_handler() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(EchoHandler));
        assert!(executor.has_handler(JobType::EmailSend));

        let result = executor.execute(&job(JobType::EmailSend)).await.unwrap();
        assert_eq!(result, Some(serde_json::json!({"k": "v"})));
    }

    #[tokio::test]
    async fn test_unregistered_type_fails_permanently() {
        let executor = JobExecutor::new();
        let err = executor
            .execute(&job(JobType::ImageProcess))
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_internal_error_classified_by_kind() {
        let transient: JobExecutionError =
            AppError::new(ErrorKind::ExternalService, "provider down").into();
        assert!(transient.is_transient());

        let permanent: JobExecutionError =
            AppError::new(ErrorKind::Validation, "bad payload").into();
        assert!(!permanent.is_transient());
    }
}
