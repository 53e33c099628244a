//! The moderation pipeline service.
//!
//! Ties the preprocessor, provider list, decision engine, enforcement
//! engine, and stores together into one image's trip through the
//! pipeline. Both queue variants call into this service.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use quadmart_core::error::AppError;
use quadmart_core::events::moderation::ModerationEvent;
use quadmart_core::result::AppResult;
use quadmart_core::types::id::{ImageId, ItemId, ModerationRecordId, UserId};
use quadmart_entity::audit::model::{ActorType, CreateAuditLogEntry};
use quadmart_entity::moderation::category::ModerationCategory;
use quadmart_entity::moderation::model::{ImageReport, ManualReview, ModerationRecord};
use quadmart_entity::moderation::status::{ModerationDecision, ModerationStatus};
use quadmart_entity::violation::types::ViolationType;
use quadmart_imaging::{perceptual_hash, DeclaredImageMeta, ImagePreprocessor, ProcessedImage};

use crate::decision::{decide, DecisionThresholds};
use crate::enforcement::{EnforcementEngine, NewViolation};
use crate::providers::ModerationProvider;
use crate::stores::{AuditSink, ModerationStore, RecordVerdict};

/// Label recorded when the quality heuristic flags an image.
const LOW_QUALITY_LABEL: &str = "low_quality";

/// Scored output of `moderate_image`: provider result plus decision.
#[derive(Debug, Clone)]
pub struct ScoredModeration {
    /// Per-category risk scores.
    pub scores: HashMap<ModerationCategory, f64>,
    /// Detected labels.
    pub labels: Vec<String>,
    /// Provider that produced the result (`"NONE"` on total failure).
    pub provider: String,
    /// The automated decision.
    pub decision: ModerationDecision,
    /// Deduplicated rejection reason codes.
    pub rejection_reasons: Vec<String>,
}

/// Outcome of one full pipeline run for one image.
#[derive(Debug)]
pub struct PipelineResult {
    /// The moderation record.
    pub record_id: ModerationRecordId,
    /// The image.
    pub image_id: ImageId,
    /// The owning item listing.
    pub item_id: ItemId,
    /// The uploading user.
    pub user_id: UserId,
    /// The automated decision.
    pub decision: ModerationDecision,
    /// Rejection reason codes, non-empty iff rejected.
    pub reasons: Vec<String>,
    /// Human-readable summary for the submitting user.
    pub message: String,
    /// Canonicalized image, present iff approved (for the storage upload).
    pub processed: Option<ProcessedImage>,
}

impl PipelineResult {
    /// Build the outcome event, with permanent URLs filled in by the
    /// caller after the storage upload.
    pub fn to_event(&self, permanent_urls: Vec<String>) -> ModerationEvent {
        match self.decision {
            ModerationDecision::AutoApproved => ModerationEvent::Approved {
                record_id: self.record_id,
                item_id: self.item_id,
                user_id: self.user_id,
                permanent_urls,
            },
            ModerationDecision::AutoRejected => ModerationEvent::Rejected {
                record_id: self.record_id,
                item_id: self.item_id,
                user_id: self.user_id,
                reasons: self.reasons.clone(),
                message: self.message.clone(),
            },
            ModerationDecision::ManualReviewRequired => ModerationEvent::ManualReview {
                record_id: self.record_id,
                item_id: self.item_id,
                user_id: self.user_id,
            },
        }
    }
}

/// Orchestrates one image's moderation lifecycle.
pub struct ModerationService {
    providers: Vec<Arc<dyn ModerationProvider>>,
    thresholds: DecisionThresholds,
    preprocessor: ImagePreprocessor,
    records: Arc<dyn ModerationStore>,
    enforcement: Arc<EnforcementEngine>,
    audit: Arc<dyn AuditSink>,
    report_flag_threshold: usize,
}

impl ModerationService {
    /// Create a new moderation service.
    pub fn new(
        providers: Vec<Arc<dyn ModerationProvider>>,
        thresholds: DecisionThresholds,
        preprocessor: ImagePreprocessor,
        records: Arc<dyn ModerationStore>,
        enforcement: Arc<EnforcementEngine>,
        audit: Arc<dyn AuditSink>,
        report_flag_threshold: usize,
    ) -> Self {
        Self {
            providers,
            thresholds,
            preprocessor,
            records,
            enforcement,
            audit,
            report_flag_threshold,
        }
    }

    /// The record store this service persists into.
    pub fn records(&self) -> Arc<dyn ModerationStore> {
        self.records.clone()
    }

    /// The enforcement engine this service sanctions through.
    pub fn enforcement(&self) -> Arc<EnforcementEngine> {
        self.enforcement.clone()
    }

    /// Score one image against the provider list.
    ///
    /// Providers are tried in priority order; failures are logged and the
    /// next provider is tried. An empty list or total failure yields the
    /// sentinel result: provider `"NONE"`, every category at the
    /// conservative mid-point, decision `ManualReviewRequired`. Provider
    /// unavailability never auto-approves.
    pub async fn moderate_image(&self, image: &[u8]) -> ScoredModeration {
        for provider in &self.providers {
            match provider.moderate(image).await {
                Ok(result) => {
                    let outcome = decide(&result.scores, &self.thresholds);
                    return ScoredModeration {
                        scores: result.scores,
                        labels: result.labels,
                        provider: result.provider,
                        decision: outcome.decision,
                        rejection_reasons: outcome.reasons,
                    };
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Moderation provider failed: {e}");
                }
            }
        }

        if !self.providers.is_empty() {
            error!("All moderation providers failed; requiring manual review");
        }
        ScoredModeration {
            scores: ModerationCategory::ALL
                .into_iter()
                .map(|c| (c, 0.5))
                .collect(),
            labels: Vec::new(),
            provider: "NONE".to_string(),
            decision: ModerationDecision::ManualReviewRequired,
            rejection_reasons: Vec::new(),
        }
    }

    /// Run the full pipeline for one image: validate, preprocess, score,
    /// decide, persist, sanction, audit.
    ///
    /// The caller uploads the processed bytes to permanent storage on
    /// approval and emits the event from [`PipelineResult::to_event`].
    pub async fn run_pipeline(
        &self,
        record: &ModerationRecord,
        image: Bytes,
    ) -> AppResult<PipelineResult> {
        self.run_pipeline_bounded(record, image, None).await
    }

    /// Run the pipeline with an explicit preprocessing dimension bound.
    ///
    /// The durable worker passes a tighter bound than the synchronous
    /// path to keep peak memory down on constrained worker hosts.
    pub async fn run_pipeline_bounded(
        &self,
        record: &ModerationRecord,
        image: Bytes,
        max_dimension: Option<u32>,
    ) -> AppResult<PipelineResult> {
        let validation = self
            .run_blocking({
                let preprocessor = self.preprocessor.clone();
                let image = image.clone();
                move || preprocessor.validate(&image, &DeclaredImageMeta::default())
            })
            .await?;

        if !validation.valid {
            let reason = validation
                .error
                .unwrap_or_else(|| "invalid image".to_string());
            return self.reject_invalid(record, reason).await;
        }

        let (processed, hash, quality) = self
            .run_blocking({
                let preprocessor = self.preprocessor.clone();
                let image = image.clone();
                move || {
                    let processed = match max_dimension {
                        Some(bound) => preprocessor.preprocess_bounded(&image, bound)?,
                        None => preprocessor.preprocess(&image)?,
                    };
                    let hash = perceptual_hash(&processed.bytes);
                    let quality = preprocessor.analyze_quality(&image);
                    Ok::<_, AppError>((processed, hash, quality))
                }
            })
            .await??;

        let mut scored = self.moderate_image(&processed.bytes).await;
        if quality.is_low_quality && !scored.labels.iter().any(|l| l == LOW_QUALITY_LABEL) {
            scored.labels.push(LOW_QUALITY_LABEL.to_string());
        }

        let status = status_for(scored.decision);
        self.records
            .persist_verdict(
                record.id,
                &RecordVerdict {
                    status,
                    decision: scored.decision,
                    scores: scored.scores.clone(),
                    provider: scored.provider.clone(),
                    labels: scored.labels.clone(),
                    rejection_reasons: scored.rejection_reasons.clone(),
                    perceptual_hash: Some(hash),
                    metadata: validation.metadata,
                },
            )
            .await?;

        // Every scored image counts toward the uploader's rejection rate;
        // validation failures never reach this point and do not count.
        if let Err(e) = self.enforcement.note_image_uploaded(record.user_id).await {
            warn!(user_id = %record.user_id, "Failed to count upload in violation ledger: {e}");
        }

        let message = match scored.decision {
            ModerationDecision::AutoApproved => "approved".to_string(),
            ModerationDecision::AutoRejected => format!(
                "Image rejected: {}",
                scored.rejection_reasons.join(", ")
            ),
            ModerationDecision::ManualReviewRequired => "pending review".to_string(),
        };

        info!(
            record_id = %record.id,
            decision = ?scored.decision,
            provider = %scored.provider,
            "Moderation decision reached"
        );

        self.audit_decision(record, &scored).await;

        if scored.decision == ModerationDecision::AutoRejected {
            self.enforcement
                .record_violation(NewViolation {
                    user_id: record.user_id,
                    image_id: Some(record.image_id),
                    item_id: Some(record.item_id),
                    violation_type: violation_type_for(&scored.rejection_reasons),
                    scores: scored.scores.clone(),
                    description: message.clone(),
                    actor: "ai".to_string(),
                })
                .await?;
        }

        let processed = (scored.decision == ModerationDecision::AutoApproved).then_some(processed);
        Ok(PipelineResult {
            record_id: record.id,
            image_id: record.image_id,
            item_id: record.item_id,
            user_id: record.user_id,
            decision: scored.decision,
            reasons: scored.rejection_reasons,
            message,
            processed,
        })
    }

    /// Apply a human reviewer's decision to a flagged record.
    pub async fn resolve_manual_review(
        &self,
        record_id: ModerationRecordId,
        reviewer_id: UserId,
        final_decision: ModerationDecision,
        notes: Option<String>,
    ) -> AppResult<()> {
        let record = self
            .records
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("moderation record {record_id}")))?;

        let review = ManualReview {
            reviewer_id,
            reviewed_at: Utc::now(),
            notes,
            final_decision,
        };
        let status = status_for(final_decision);
        self.records
            .attach_manual_review(record_id, &review, status)
            .await?;

        self.audit_best_effort(CreateAuditLogEntry {
            action: "moderation.manual_review_resolved".to_string(),
            image_id: Some(record.image_id),
            item_id: Some(record.item_id),
            user_id: Some(record.user_id),
            actor_type: ActorType::Admin,
            actor_id: Some(reviewer_id.to_string()),
            details: Some(json!({ "final_decision": final_decision })),
        })
        .await;

        if final_decision == ModerationDecision::AutoRejected {
            self.enforcement
                .record_violation(NewViolation {
                    user_id: record.user_id,
                    image_id: Some(record.image_id),
                    item_id: Some(record.item_id),
                    violation_type: violation_type_for(&record.rejection_reasons),
                    scores: record.ai_scores.0.clone(),
                    description: "Rejected after manual review".to_string(),
                    actor: format!("admin:{reviewer_id}"),
                })
                .await?;
        }
        Ok(())
    }

    /// File a user report against a record, auto-flagging it once enough
    /// distinct reporters accumulate.
    pub async fn report_image(
        &self,
        record_id: ModerationRecordId,
        reporter_id: UserId,
        reason: String,
        detail: Option<String>,
    ) -> AppResult<()> {
        let report = ImageReport {
            reporter_id,
            reported_at: Utc::now(),
            reason,
            detail,
        };
        self.records.append_report(record_id, &report).await?;

        let record = self
            .records
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("moderation record {record_id}")))?;

        if record.status != ModerationStatus::Flagged
            && !record.is_decided()
            && record.distinct_reporters() >= self.report_flag_threshold
        {
            self.records
                .set_status(record_id, ModerationStatus::Flagged)
                .await?;
            self.audit_best_effort(CreateAuditLogEntry {
                action: "moderation.report_flagged".to_string(),
                image_id: Some(record.image_id),
                item_id: Some(record.item_id),
                user_id: Some(record.user_id),
                actor_type: ActorType::System,
                actor_id: Some("system".to_string()),
                details: Some(json!({ "reporters": record.distinct_reporters() })),
            })
            .await;
            info!(%record_id, "Record auto-flagged from user reports");
        }
        Ok(())
    }

    async fn reject_invalid(
        &self,
        record: &ModerationRecord,
        reason: String,
    ) -> AppResult<PipelineResult> {
        let reasons = vec!["INVALID_IMAGE".to_string()];
        self.records
            .persist_verdict(
                record.id,
                &RecordVerdict {
                    status: ModerationStatus::Rejected,
                    decision: ModerationDecision::AutoRejected,
                    scores: HashMap::new(),
                    provider: "validation".to_string(),
                    labels: Vec::new(),
                    rejection_reasons: reasons.clone(),
                    perceptual_hash: None,
                    metadata: None,
                },
            )
            .await?;

        self.audit_best_effort(CreateAuditLogEntry {
            action: "moderation.validation_rejected".to_string(),
            image_id: Some(record.image_id),
            item_id: Some(record.item_id),
            user_id: Some(record.user_id),
            actor_type: ActorType::System,
            actor_id: Some("validation".to_string()),
            details: Some(json!({ "reason": reason })),
        })
        .await;

        Ok(PipelineResult {
            record_id: record.id,
            image_id: record.image_id,
            item_id: record.item_id,
            user_id: record.user_id,
            decision: ModerationDecision::AutoRejected,
            reasons,
            message: reason,
            processed: None,
        })
    }

    async fn audit_decision(&self, record: &ModerationRecord, scored: &ScoredModeration) {
        let action = match scored.decision {
            ModerationDecision::AutoApproved => "moderation.auto_approved",
            ModerationDecision::AutoRejected => "moderation.auto_rejected",
            ModerationDecision::ManualReviewRequired => "moderation.manual_review",
        };
        self.audit_best_effort(CreateAuditLogEntry {
            action: action.to_string(),
            image_id: Some(record.image_id),
            item_id: Some(record.item_id),
            user_id: Some(record.user_id),
            actor_type: ActorType::Ai,
            actor_id: Some(scored.provider.clone()),
            details: Some(json!({
                "scores": scored.scores,
                "reasons": scored.rejection_reasons,
            })),
        })
        .await;
    }

    async fn audit_best_effort(&self, entry: CreateAuditLogEntry) {
        if let Err(e) = self.audit.append(&entry).await {
            error!(action = %entry.action, "Audit write failed: {e}");
        }
    }

    async fn run_blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| AppError::internal(format!("blocking image task failed: {e}")))
    }
}

fn status_for(decision: ModerationDecision) -> ModerationStatus {
    match decision {
        ModerationDecision::AutoApproved => ModerationStatus::Approved,
        ModerationDecision::AutoRejected => ModerationStatus::Rejected,
        ModerationDecision::ManualReviewRequired => ModerationStatus::Flagged,
    }
}

/// Violation type matching the highest-precedence rejection reason.
fn violation_type_for(reasons: &[String]) -> ViolationType {
    match reasons.first().map(String::as_str) {
        Some("NUDITY") => ViolationType::Nudity,
        Some("VIOLENCE") => ViolationType::Violence,
        Some("HATE") => ViolationType::HateSpeech,
        Some("SPAM") => ViolationType::Spam,
        Some("DRUGS") => ViolationType::Drugs,
        Some("WEAPONS") => ViolationType::Weapons,
        _ => ViolationType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{ImageFormat, RgbImage};

    use quadmart_core::config::enforcement::EnforcementConfig;
    use quadmart_core::config::imaging::ImagingConfig;
    use quadmart_core::config::moderation::ModerationConfig;
    use quadmart_entity::moderation::model::CreateModerationRecord;
    use quadmart_entity::violation::types::AccountStatus;

    use crate::memory_store::{
        InMemoryAuditSink, InMemoryModerationStore, InMemoryViolationStore,
    };
    use crate::providers::ScoreResult;
    use crate::stores::ViolationStore;

    /// Provider double returning a fixed score vector.
    struct StaticProvider {
        scores: HashMap<ModerationCategory, f64>,
        labels: Vec<String>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ModerationProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn moderate(&self, _image: &[u8]) -> AppResult<ScoreResult> {
            if self.fail {
                return Err(AppError::external_service("static provider down"));
            }
            Ok(ScoreResult {
                scores: self.scores.clone(),
                labels: self.labels.clone(),
                provider: "static".to_string(),
            })
        }
    }

    struct Harness {
        service: ModerationService,
        records: Arc<InMemoryModerationStore>,
        violations: Arc<InMemoryViolationStore>,
        audit: Arc<InMemoryAuditSink>,
    }

    fn harness(providers: Vec<Arc<dyn ModerationProvider>>) -> Harness {
        let records = Arc::new(InMemoryModerationStore::new());
        let violations = Arc::new(InMemoryViolationStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let enforcement = Arc::new(EnforcementEngine::new(
            EnforcementConfig::default(),
            violations.clone(),
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
        let service = ModerationService::new(
            providers,
            DecisionThresholds::from_config(&ModerationConfig::default()),
            preprocessor,
            records.clone(),
            enforcement,
            audit.clone(),
            3,
        );
        Harness {
            service,
            records,
            violations,
            audit,
        }
    }

    fn static_provider(scores: &[(ModerationCategory, f64)]) -> Arc<dyn ModerationProvider> {
        Arc::new(StaticProvider {
            scores: scores.iter().copied().collect(),
            labels: vec!["Laptop".to_string()],
            fail: false,
        })
    }

    fn failing_provider() -> Arc<dyn ModerationProvider> {
        Arc::new(StaticProvider {
            scores: HashMap::new(),
            labels: Vec::new(),
            fail: true,
        })
    }

    fn test_image() -> Bytes {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
        });
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode");
        Bytes::from(buf)
    }

    async fn new_record(store: &InMemoryModerationStore) -> ModerationRecord {
        store
            .create(&CreateModerationRecord {
                image_id: ImageId::new(),
                item_id: ItemId::new(),
                user_id: UserId::new(),
                temp_url: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_provider_list_forces_manual_review() {
        let h = harness(Vec::new());
        let scored = h.service.moderate_image(b"ignored").await;
        assert_eq!(scored.provider, "NONE");
        assert_eq!(scored.decision, ModerationDecision::ManualReviewRequired);
        assert!(scored.scores.values().all(|&s| s == 0.5));
    }

    #[tokio::test]
    async fn test_all_providers_failing_forces_manual_review() {
        let h = harness(vec![failing_provider(), failing_provider()]);
        let scored = h.service.moderate_image(b"ignored").await;
        assert_eq!(scored.provider, "NONE");
        assert_eq!(scored.decision, ModerationDecision::ManualReviewRequired);
    }

    #[tokio::test]
    async fn test_fallback_to_second_provider() {
        let h = harness(vec![
            failing_provider(),
            static_provider(&[(ModerationCategory::Nudity, 0.1)]),
        ]);
        let scored = h.service.moderate_image(b"ignored").await;
        assert_eq!(scored.provider, "static");
        assert_eq!(scored.decision, ModerationDecision::AutoApproved);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_unsafe_image_and_sanctions_user() {
        let h = harness(vec![static_provider(&[(ModerationCategory::Nudity, 0.9)])]);
        let record = new_record(&h.records).await;

        let result = h
            .service
            .run_pipeline(&record, test_image())
            .await
            .unwrap();

        assert_eq!(result.decision, ModerationDecision::AutoRejected);
        assert!(result.reasons.contains(&"NUDITY".to_string()));
        assert!(result.processed.is_none());

        let stored = h.records.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ModerationStatus::Rejected);
        assert_eq!(stored.provider.as_deref(), Some("static"));

        // The rejection drove a HIGH violation: 2.0 strikes, suspension.
        let ledger = h
            .violations
            .get(record.user_id)
            .await
            .unwrap()
            .expect("ledger created");
        assert_eq!(ledger.active_strikes, 2.0);
        assert_eq!(ledger.account_status, AccountStatus::Suspended);
    }

    #[tokio::test]
    async fn test_pipeline_approves_clean_image_with_processed_output() {
        let h = harness(vec![static_provider(&[(ModerationCategory::Nudity, 0.05)])]);
        let record = new_record(&h.records).await;

        let result = h
            .service
            .run_pipeline(&record, test_image())
            .await
            .unwrap();

        assert_eq!(result.decision, ModerationDecision::AutoApproved);
        let processed = result.processed.expect("processed bytes for upload");
        assert!(!processed.metadata.has_exif);

        let stored = h.records.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ModerationStatus::Approved);
        assert!(stored.perceptual_hash.is_some());

        // An approved image counts as an upload but earns no strikes.
        let ledger = h
            .violations
            .get(record.user_id)
            .await
            .unwrap()
            .expect("ledger tracks the upload");
        assert_eq!(ledger.images_uploaded, 1);
        assert_eq!(ledger.images_rejected, 0);
        assert_eq!(ledger.active_strikes, 0.0);
        assert_eq!(ledger.rejection_rate, 0.0);
    }

    #[tokio::test]
    async fn test_rejection_rate_tracks_scored_uploads() {
        let h = harness(vec![static_provider(&[(ModerationCategory::Spam, 0.95)])]);
        let user_id = UserId::new();

        for _ in 0..2 {
            let record = h
                .records
                .create(&CreateModerationRecord {
                    image_id: ImageId::new(),
                    item_id: ItemId::new(),
                    user_id,
                    temp_url: None,
                })
                .await
                .unwrap();
            h.service.run_pipeline(&record, test_image()).await.unwrap();
        }

        let ledger = h.violations.get(user_id).await.unwrap().unwrap();
        assert_eq!(ledger.images_uploaded, 2);
        assert_eq!(ledger.images_rejected, 2);
        assert_eq!(ledger.rejection_rate, 1.0);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_undecodable_upload() {
        let h = harness(vec![static_provider(&[])]);
        let record = new_record(&h.records).await;

        let result = h
            .service
            .run_pipeline(&record, Bytes::from_static(b"not an image"))
            .await
            .unwrap();

        assert_eq!(result.decision, ModerationDecision::AutoRejected);
        assert_eq!(result.reasons, vec!["INVALID_IMAGE".to_string()]);

        // Validation failures are not policy violations.
        assert!(h.violations.get(record.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pipeline_writes_decision_audit_entry() {
        let h = harness(vec![static_provider(&[(ModerationCategory::Spam, 0.95)])]);
        let record = new_record(&h.records).await;
        h.service.run_pipeline(&record, test_image()).await.unwrap();

        let actions: Vec<String> = h.audit.entries().iter().map(|e| e.action.clone()).collect();
        assert!(actions.contains(&"moderation.auto_rejected".to_string()));
        // Plus the enforcement entry for the violation itself.
        assert!(actions.iter().any(|a| a.starts_with("enforcement.")));
    }

    #[tokio::test]
    async fn test_manual_review_rejection_sanctions_user() {
        let h = harness(Vec::new());
        let record = new_record(&h.records).await;
        let reviewer = UserId::new();

        h.service
            .resolve_manual_review(
                record.id,
                reviewer,
                ModerationDecision::AutoRejected,
                Some("counterfeit listing".to_string()),
            )
            .await
            .unwrap();

        let stored = h.records.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ModerationStatus::Rejected);
        assert!(stored.manual_review.is_some());
        assert!(h.violations.get(record.user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reports_flag_record_at_threshold() {
        let h = harness(Vec::new());
        let record = new_record(&h.records).await;

        for i in 0..3 {
            h.service
                .report_image(record.id, UserId::new(), format!("reason-{i}"), None)
                .await
                .unwrap();
        }

        let stored = h.records.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ModerationStatus::Flagged);
    }

    #[tokio::test]
    async fn test_duplicate_reporters_do_not_flag() {
        let h = harness(Vec::new());
        let record = new_record(&h.records).await;
        let reporter = UserId::new();

        for _ in 0..5 {
            h.service
                .report_image(record.id, reporter, "spam".to_string(), None)
                .await
                .unwrap();
        }

        let stored = h.records.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ModerationStatus::Pending);
    }
}
