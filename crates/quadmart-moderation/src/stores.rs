//! Store seams used by the moderation service and enforcement engine.
//!
//! The traits are defined here where they are consumed; the Postgres
//! repositories implement them below and in-memory versions live in
//! [`crate::memory_store`] for the ephemeral queue variant and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use quadmart_core::result::AppResult;
use quadmart_core::types::id::{ModerationRecordId, UserId};
use quadmart_database::repositories::audit::AuditLogRepository;
use quadmart_database::repositories::moderation::ModerationRepository;
use quadmart_database::repositories::violation::ViolationRepository;
use quadmart_entity::audit::model::CreateAuditLogEntry;
use quadmart_entity::moderation::category::ModerationCategory;
use quadmart_entity::moderation::model::{
    CreateModerationRecord, ImageMeta, ImageReport, ManualReview, ModerationRecord,
};
use quadmart_entity::moderation::status::{ModerationDecision, ModerationStatus};
use quadmart_entity::violation::model::UserViolation;

/// Scoring outcome of one pipeline run, persisted in a single update.
#[derive(Debug, Clone)]
pub struct RecordVerdict {
    /// New record status.
    pub status: ModerationStatus,
    /// Automated decision.
    pub decision: ModerationDecision,
    /// Per-category AI scores.
    pub scores: HashMap<ModerationCategory, f64>,
    /// Provider that produced the scores (`"NONE"` on total failure).
    pub provider: String,
    /// Detected labels.
    pub labels: Vec<String>,
    /// Deduplicated rejection reason codes.
    pub rejection_reasons: Vec<String>,
    /// Perceptual hash of the preprocessed image.
    pub perceptual_hash: Option<String>,
    /// Image metadata captured during validation.
    pub metadata: Option<ImageMeta>,
}

/// Persistence for moderation records.
#[async_trait]
pub trait ModerationStore: Send + Sync + 'static {
    /// Create a pending record for an image entering the pipeline.
    async fn create(&self, data: &CreateModerationRecord) -> AppResult<ModerationRecord>;

    /// Fetch one record.
    async fn find_by_id(&self, id: ModerationRecordId) -> AppResult<Option<ModerationRecord>>;

    /// Persist the scoring outcome of one pipeline run.
    async fn persist_verdict(&self, id: ModerationRecordId, verdict: &RecordVerdict)
        -> AppResult<()>;

    /// Record the permanent URL after a successful storage upload.
    async fn mark_approved(&self, id: ModerationRecordId, permanent_url: &str) -> AppResult<()>;

    /// Record a processing error against the record.
    async fn mark_error(&self, id: ModerationRecordId, error: &str) -> AppResult<()>;

    /// Transition a record's status.
    async fn set_status(&self, id: ModerationRecordId, status: ModerationStatus) -> AppResult<()>;

    /// Attach a manual review outcome with its resulting status.
    async fn attach_manual_review(
        &self,
        id: ModerationRecordId,
        review: &ManualReview,
        status: ModerationStatus,
    ) -> AppResult<()>;

    /// Append one user report to the record.
    async fn append_report(&self, id: ModerationRecordId, report: &ImageReport) -> AppResult<()>;
}

/// Persistence for the per-user enforcement ledger.
#[async_trait]
pub trait ViolationStore: Send + Sync + 'static {
    /// Fetch a user's ledger, if one exists.
    async fn get(&self, user_id: UserId) -> AppResult<Option<UserViolation>>;

    /// Insert or fully replace a user's ledger.
    async fn upsert(&self, ledger: &UserViolation) -> AppResult<()>;

    /// Ledgers with decayable strikes, for the periodic decay sweep.
    async fn find_decay_candidates(&self, limit: i64) -> AppResult<Vec<UserViolation>>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Append one entry.
    async fn append(&self, entry: &CreateAuditLogEntry) -> AppResult<()>;
}

#[async_trait]
impl ModerationStore for ModerationRepository {
    async fn create(&self, data: &CreateModerationRecord) -> AppResult<ModerationRecord> {
        ModerationRepository::create(self, data).await
    }

    async fn find_by_id(&self, id: ModerationRecordId) -> AppResult<Option<ModerationRecord>> {
        ModerationRepository::find_by_id(self, id).await
    }

    async fn persist_verdict(
        &self,
        id: ModerationRecordId,
        verdict: &RecordVerdict,
    ) -> AppResult<()> {
        ModerationRepository::persist_verdict(
            self,
            id,
            verdict.status,
            verdict.decision,
            &verdict.scores,
            &verdict.provider,
            &verdict.labels,
            &verdict.rejection_reasons,
            verdict.perceptual_hash.as_deref(),
            verdict.metadata.as_ref(),
        )
        .await
    }

    async fn mark_approved(&self, id: ModerationRecordId, permanent_url: &str) -> AppResult<()> {
        ModerationRepository::mark_approved(self, id, permanent_url).await
    }

    async fn mark_error(&self, id: ModerationRecordId, error: &str) -> AppResult<()> {
        ModerationRepository::mark_error(self, id, error).await
    }

    async fn set_status(&self, id: ModerationRecordId, status: ModerationStatus) -> AppResult<()> {
        ModerationRepository::set_status(self, id, status).await
    }

    async fn attach_manual_review(
        &self,
        id: ModerationRecordId,
        review: &ManualReview,
        status: ModerationStatus,
    ) -> AppResult<()> {
        ModerationRepository::attach_manual_review(self, id, review, status).await
    }

    async fn append_report(&self, id: ModerationRecordId, report: &ImageReport) -> AppResult<()> {
        ModerationRepository::append_report(self, id, report).await
    }
}

#[async_trait]
impl ViolationStore for ViolationRepository {
    async fn get(&self, user_id: UserId) -> AppResult<Option<UserViolation>> {
        ViolationRepository::get(self, user_id).await
    }

    async fn upsert(&self, ledger: &UserViolation) -> AppResult<()> {
        ViolationRepository::upsert(self, ledger).await
    }

    async fn find_decay_candidates(&self, limit: i64) -> AppResult<Vec<UserViolation>> {
        ViolationRepository::find_decay_candidates(self, limit).await
    }
}

#[async_trait]
impl AuditSink for AuditLogRepository {
    async fn append(&self, entry: &CreateAuditLogEntry) -> AppResult<()> {
        AuditLogRepository::append(self, entry).await.map(|_| ())
    }
}
