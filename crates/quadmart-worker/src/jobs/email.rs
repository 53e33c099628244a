//! Email notification job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use quadmart_core::result::AppResult;
use quadmart_entity::job::model::Job;
use quadmart_entity::job::status::JobType;

use crate::executor::{JobExecutionError, JobHandler};

/// Payload of an email job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Outbound email delivery.
///
/// The pipeline only depends on this seam; deployments plug in an SMTP
/// or provider-backed implementation.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// Sender that records the message in the log instead of delivering it.
/// Default for development and single-instance deployments.
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
        info!(to, subject, "Email (log sender, not delivered)");
        Ok(())
    }
}

/// Handler for [`JobType::EmailSend`] jobs.
pub struct EmailJobHandler {
    sender: Arc<dyn EmailSender>,
}

impl EmailJobHandler {
    /// Create a handler delivering through the given sender.
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl JobHandler for EmailJobHandler {
    fn job_type(&self) -> JobType {
        JobType::EmailSend
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: EmailPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid payload: {e}")))?;

        self.sender
            .send(&payload.to, &payload.subject, &payload.body)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Email delivery failed: {e}")))?;

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use quadmart_entity::job::status::JobStatus;

    fn email_job(payload: Value) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: JobType::EmailSend,
            payload,
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
    async fn test_delivers_through_sender() {
        let handler = EmailJobHandler::new(Arc::new(LogEmailSender));
        let job = email_job(serde_json::json!({
            "to": "student@campus.edu",
            "subject": "Image rejected",
            "body": "Your listing image was rejected.",
        }));
        assert!(handler.execute(&job).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_permanent() {
        let handler = EmailJobHandler::new(Arc::new(LogEmailSender));
        let err = handler
            .execute(&email_job(serde_json::json!({"to": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
