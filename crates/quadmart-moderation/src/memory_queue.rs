//! Ephemeral in-process moderation queue.
//!
//! Runs a small fixed number of images concurrently with no persistence
//! and no crash survival. Shares the decision and enforcement logic with
//! the durable queue through [`ModerationService`]; suited to
//! single-instance deployments and the synchronous moderation-only path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{error, info};

use quadmart_core::result::AppResult;
use quadmart_core::types::id::ModerationRecordId;
use quadmart_entity::moderation::model::CreateModerationRecord;

use crate::context::PipelineContext;
use crate::service::ModerationService;

/// Operational counters for the in-memory queue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryQueueStats {
    /// Images waiting for a concurrency slot.
    pub queue_size: usize,
    /// Images currently being processed.
    pub processing: usize,
    /// Maximum concurrent images.
    pub concurrency: usize,
}

/// Bounded-concurrency in-memory moderation queue.
pub struct InMemoryModerationQueue {
    service: Arc<ModerationService>,
    context: PipelineContext,
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    processing: Arc<AtomicUsize>,
    concurrency: usize,
}

impl InMemoryModerationQueue {
    /// Create a queue processing at most `concurrency` images at a time.
    pub fn new(
        service: Arc<ModerationService>,
        context: PipelineContext,
        concurrency: usize,
    ) -> Self {
        Self {
            service,
            context,
            permits: Arc::new(Semaphore::new(concurrency)),
            waiting: Arc::new(AtomicUsize::new(0)),
            processing: Arc::new(AtomicUsize::new(0)),
            concurrency,
        }
    }

    /// Enqueue one image for moderation. Fire-and-forget: creates the
    /// record, returns its id immediately, and processes in the
    /// background, emitting the outcome event on completion.
    pub async fn enqueue(
        &self,
        data: CreateModerationRecord,
        image: Bytes,
    ) -> AppResult<ModerationRecordId> {
        let record = self.service.records().create(&data).await?;
        let record_id = record.id;

        let service = self.service.clone();
        let context = self.context.clone();
        let permits = self.permits.clone();
        let waiting = self.waiting.clone();
        let processing = self.processing.clone();

        waiting.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            // Closed only on shutdown; nothing left to do then.
            let Ok(_permit) = permits.acquire().await else {
                waiting.fetch_sub(1, Ordering::SeqCst);
                return;
            };
            waiting.fetch_sub(1, Ordering::SeqCst);
            processing.fetch_add(1, Ordering::SeqCst);

            match service.run_pipeline(&record, image).await {
                Ok(result) => {
                    context.emit(result.to_event(Vec::new()));
                    info!(%record_id, decision = ?result.decision, "In-memory moderation finished");
                }
                Err(e) => {
                    error!(%record_id, "In-memory moderation failed: {e}");
                    if let Err(e) = service
                        .records()
                        .mark_error(record_id, &e.to_string())
                        .await
                    {
                        error!(%record_id, "Failed to record moderation error: {e}");
                    }
                }
            }
            processing.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(record_id)
    }

    /// Operational counters.
    pub fn stats(&self) -> MemoryQueueStats {
        MemoryQueueStats {
            queue_size: self.waiting.load(Ordering::SeqCst),
            processing: self.processing.load(Ordering::SeqCst),
            concurrency: self.concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::time::Duration;

    use image::{ImageFormat, RgbImage};

    use quadmart_core::config::enforcement::EnforcementConfig;
    use quadmart_core::config::imaging::ImagingConfig;
    use quadmart_core::config::moderation::ModerationConfig;
    use quadmart_core::events::moderation::ModerationEvent;
    use quadmart_core::types::id::{ImageId, ItemId, UserId};
    use quadmart_entity::moderation::category::ModerationCategory;
    use quadmart_imaging::ImagePreprocessor;

    use crate::decision::DecisionThresholds;
    use crate::enforcement::EnforcementEngine;
    use crate::memory_store::{
        InMemoryAuditSink, InMemoryModerationStore, InMemoryViolationStore,
    };
    use crate::providers::{ModerationProvider, ScoreResult};

    struct CleanProvider;

    #[async_trait::async_trait]
    impl ModerationProvider for CleanProvider {
        fn name(&self) -> &str {
            "clean"
        }

        async fn moderate(&self, _image: &[u8]) -> AppResult<ScoreResult> {
            Ok(ScoreResult {
                scores: HashMap::from([(ModerationCategory::Nudity, 0.05)]),
                labels: Vec::new(),
                provider: "clean".to_string(),
            })
        }
    }

    fn queue() -> (InMemoryModerationQueue, PipelineContext) {
        let records = Arc::new(InMemoryModerationStore::new());
        let violations = Arc::new(InMemoryViolationStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let enforcement = Arc::new(EnforcementEngine::new(
            EnforcementConfig::default(),
            violations,
            audit.clone(),
        ));
        let preprocessor = ImagePreprocessor::new(ImagingConfig {
            max_bytes: 1024 * 1024,
            min_dimension: 16,
            max_dimension: 256,
            worker_max_dimension: 128,
            jpeg_quality: 85,
            low_quality_cutoff: 0.0,
            download_timeout_seconds: 5,
        });
        let service = Arc::new(ModerationService::new(
            vec![Arc::new(CleanProvider)],
            DecisionThresholds::from_config(&ModerationConfig::default()),
            preprocessor,
            records,
            enforcement,
            audit,
            3,
        ));
        let context = PipelineContext::new(16);
        (
            InMemoryModerationQueue::new(service, context.clone(), 3),
            context,
        )
    }

    fn test_image() -> Bytes {
        let img = RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 0]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode");
        Bytes::from(buf)
    }

    #[tokio::test]
    async fn test_enqueue_emits_outcome_event() {
        let (queue, context) = queue();
        let mut rx = context.subscribe();

        let record_id = queue
            .enqueue(
                CreateModerationRecord {
                    image_id: ImageId::new(),
                    item_id: ItemId::new(),
                    user_id: UserId::new(),
                    temp_url: None,
                },
                test_image(),
            )
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        assert_eq!(event.record_id(), record_id);
        assert!(matches!(event, ModerationEvent::Approved { .. }));
    }

    #[tokio::test]
    async fn test_stats_reflect_concurrency_bound() {
        let (queue, _context) = queue();
        assert_eq!(queue.stats().concurrency, 3);
        assert_eq!(queue.stats().processing, 0);
    }
}
