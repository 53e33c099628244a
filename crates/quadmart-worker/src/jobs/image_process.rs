//! Image moderation job handler.
//!
//! Downloads the temp upload, runs the full moderation pipeline, uploads
//! the canonical bytes to permanent storage on approval, and emits the
//! outcome event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use quadmart_core::config::imaging::ImagingConfig;
use quadmart_core::result::AppResult;
use quadmart_core::traits::ObjectStore;
use quadmart_core::types::id::{ImageId, ItemId, ModerationRecordId};
use quadmart_core::AppError;
use quadmart_entity::job::model::Job;
use quadmart_entity::job::status::JobType;
use quadmart_entity::moderation::status::ModerationDecision;
use quadmart_moderation::{ModerationService, PipelineContext};

use crate::executor::{JobExecutionError, JobHandler};

/// Payload of an image-processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageProcessPayload {
    /// The moderation record to process.
    pub record_id: ModerationRecordId,
    /// Temp upload URL; falls back to the record's `temp_url` when absent.
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Handler for [`JobType::ImageProcess`] jobs.
pub struct ImageProcessJobHandler {
    service: Arc<ModerationService>,
    store: Arc<dyn ObjectStore>,
    context: PipelineContext,
    http: reqwest::Client,
    worker_max_dimension: u32,
}

impl ImageProcessJobHandler {
    /// Create a handler with a download client bounded by the configured
    /// timeout.
    pub fn new(
        service: Arc<ModerationService>,
        store: Arc<dyn ObjectStore>,
        context: PipelineContext,
        imaging: &ImagingConfig,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(imaging.download_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    quadmart_core::error::ErrorKind::Configuration,
                    "Failed to build download client",
                    e,
                )
            })?;
        Ok(Self {
            service,
            store,
            context,
            http,
            worker_max_dimension: imaging.worker_max_dimension,
        })
    }

    /// Fetch the temp upload. A missing source (4xx) is permanent; network
    /// failures and server errors are worth retrying.
    async fn download(&self, url: &str) -> Result<Bytes, JobExecutionError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Download failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(JobExecutionError::Permanent(format!(
                "Temp image unavailable: HTTP {status} from {url}"
            )));
        }
        if !status.is_success() {
            return Err(JobExecutionError::Transient(format!(
                "Download returned HTTP {status} from {url}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Download read failed: {e}")))
    }
}

#[async_trait]
impl JobHandler for ImageProcessJobHandler {
    fn job_type(&self) -> JobType {
        JobType::ImageProcess
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: ImageProcessPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid payload: {e}")))?;

        let records = self.service.records();
        let record = records
            .find_by_id(payload.record_id)
            .await
            .map_err(JobExecutionError::Internal)?
            .ok_or_else(|| {
                JobExecutionError::Permanent(format!(
                    "Moderation record {} not found",
                    payload.record_id
                ))
            })?;

        let source_url = payload
            .source_url
            .or_else(|| record.temp_url.clone())
            .ok_or_else(|| {
                JobExecutionError::Permanent(format!(
                    "Moderation record {} has no source URL",
                    record.id
                ))
            })?;

        let image = self.download(&source_url).await?;

        let result = match self
            .service
            .run_pipeline_bounded(&record, image, Some(self.worker_max_dimension))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if let Err(mark) = records.mark_error(record.id, &e.to_string()).await {
                    error!(record_id = %record.id, "Failed to record pipeline error: {mark}");
                }
                return Err(JobExecutionError::Internal(e));
            }
        };

        let mut permanent_urls = Vec::new();
        if result.decision == ModerationDecision::AutoApproved {
            let processed = result.processed.as_ref().ok_or_else(|| {
                JobExecutionError::Permanent("Approved image missing processed bytes".to_string())
            })?;
            let key = storage_key(record.item_id, record.image_id);
            let url = self
                .store
                .upload(&key, Bytes::from(processed.bytes.clone()), "image/jpeg")
                .await
                .map_err(JobExecutionError::Internal)?;

            records
                .mark_approved(record.id, &url)
                .await
                .map_err(JobExecutionError::Internal)?;
            permanent_urls.push(url);
        }

        self.context.emit(result.to_event(permanent_urls.clone()));
        info!(
            record_id = %record.id,
            decision = ?result.decision,
            "Image processing job finished"
        );

        Ok(Some(json!({
            "decision": result.decision,
            "reasons": result.reasons,
            "permanent_urls": permanent_urls,
        })))
    }
}

/// Permanent storage key for an approved listing image.
fn storage_key(item_id: ItemId, image_id: ImageId) -> String {
    format!("listings/{item_id}/{image_id}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trips_with_optional_source() {
        let payload = ImageProcessPayload {
            record_id: ModerationRecordId::new(),
            source_url: Some("http://tmp/a.png".to_string()),
        };
        let value = serde_json::to_value(&payload).unwrap();
        let back: ImageProcessPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.record_id, payload.record_id);
        assert_eq!(back.source_url.as_deref(), Some("http://tmp/a.png"));

        // Older enqueuers omit source_url entirely.
        let minimal = json!({ "record_id": ModerationRecordId::new() });
        let parsed: ImageProcessPayload = serde_json::from_value(minimal).unwrap();
        assert!(parsed.source_url.is_none());
    }

    #[test]
    fn test_storage_key_layout() {
        let item_id = ItemId::new();
        let image_id = ImageId::new();
        let key = storage_key(item_id, image_id);
        assert_eq!(key, format!("listings/{item_id}/{image_id}.jpg"));
    }
}
