//! In-memory store implementations backing the ephemeral queue variant.
//!
//! No crash survival; suited to single-instance deployments and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::types::Json;

use quadmart_core::result::AppResult;
use quadmart_core::types::id::{AuditLogId, ModerationRecordId, UserId};
use quadmart_entity::audit::model::{AuditLogEntry, CreateAuditLogEntry};
use quadmart_entity::moderation::model::{
    CreateModerationRecord, ImageReport, ManualReview, ModerationRecord,
};
use quadmart_entity::moderation::status::ModerationStatus;
use quadmart_entity::violation::model::UserViolation;

use crate::stores::{AuditSink, ModerationStore, RecordVerdict, ViolationStore};

/// Moderation records held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryModerationStore {
    records: DashMap<ModerationRecordId, ModerationRecord>,
}

impl InMemoryModerationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn create(&self, data: &CreateModerationRecord) -> AppResult<ModerationRecord> {
        let now = Utc::now();
        let record = ModerationRecord {
            id: ModerationRecordId::new(),
            image_id: data.image_id,
            item_id: data.item_id,
            user_id: data.user_id,
            temp_url: data.temp_url.clone(),
            permanent_url: None,
            perceptual_hash: None,
            status: ModerationStatus::Pending,
            decision: None,
            ai_scores: Json(HashMap::new()),
            provider: None,
            labels: Json(Vec::new()),
            rejection_reasons: Json(Vec::new()),
            manual_review: None,
            reports: Json(Vec::new()),
            metadata: None,
            attempts: 0,
            last_processed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: ModerationRecordId) -> AppResult<Option<ModerationRecord>> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn persist_verdict(
        &self,
        id: ModerationRecordId,
        verdict: &RecordVerdict,
    ) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.status = verdict.status;
            record.decision = Some(verdict.decision);
            record.ai_scores = Json(verdict.scores.clone());
            record.provider = Some(verdict.provider.clone());
            record.labels = Json(verdict.labels.clone());
            record.rejection_reasons = Json(verdict.rejection_reasons.clone());
            record.perceptual_hash = verdict.perceptual_hash.clone();
            record.metadata = verdict.metadata.clone().map(Json);
            record.attempts += 1;
            record.last_processed_at = Some(Utc::now());
            record.error_message = None;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_approved(&self, id: ModerationRecordId, permanent_url: &str) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.status = ModerationStatus::Approved;
            record.permanent_url = Some(permanent_url.to_string());
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_error(&self, id: ModerationRecordId, error: &str) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.attempts += 1;
            record.error_message = Some(error.to_string());
            record.last_processed_at = Some(Utc::now());
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_status(&self, id: ModerationRecordId, status: ModerationStatus) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn attach_manual_review(
        &self,
        id: ModerationRecordId,
        review: &ManualReview,
        status: ModerationStatus,
    ) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.manual_review = Some(Json(review.clone()));
            record.status = status;
            record.decision = Some(review.final_decision);
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn append_report(&self, id: ModerationRecordId, report: &ImageReport) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.reports.push(report.clone());
            record.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Violation ledgers held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryViolationStore {
    ledgers: DashMap<UserId, UserViolation>,
}

impl InMemoryViolationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationStore for InMemoryViolationStore {
    async fn get(&self, user_id: UserId) -> AppResult<Option<UserViolation>> {
        Ok(self.ledgers.get(&user_id).map(|l| l.clone()))
    }

    async fn upsert(&self, ledger: &UserViolation) -> AppResult<()> {
        self.ledgers.insert(ledger.user_id, ledger.clone());
        Ok(())
    }

    async fn find_decay_candidates(&self, limit: i64) -> AppResult<Vec<UserViolation>> {
        let mut candidates: Vec<UserViolation> = self
            .ledgers
            .iter()
            .filter(|l| l.active_strikes > 0.0 && !l.permanently_banned)
            .map(|l| l.clone())
            .collect();
        candidates.sort_by_key(|l| l.last_violation_at);
        candidates.truncate(limit as usize);
        Ok(candidates)
    }
}

/// Audit entries held in process memory, in append order.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().expect("audit sink poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, entry: &CreateAuditLogEntry) -> AppResult<()> {
        let full = AuditLogEntry {
            id: AuditLogId::new(),
            action: entry.action.clone(),
            image_id: entry.image_id,
            item_id: entry.item_id,
            user_id: entry.user_id,
            actor_type: entry.actor_type,
            actor_id: entry.actor_id.clone(),
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        self.entries.lock().expect("audit sink poisoned").push(full);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmart_core::types::id::{ImageId, ItemId};

    fn create_data() -> CreateModerationRecord {
        CreateModerationRecord {
            image_id: ImageId::new(),
            item_id: ItemId::new(),
            user_id: UserId::new(),
            temp_url: Some("http://tmp/img.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_record() {
        let store = InMemoryModerationStore::new();
        let record = store.create(&create_data()).await.unwrap();
        assert_eq!(record.status, ModerationStatus::Pending);

        let fetched = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, record.id);
    }

    #[tokio::test]
    async fn test_report_append_accumulates() {
        let store = InMemoryModerationStore::new();
        let record = store.create(&create_data()).await.unwrap();

        for _ in 0..2 {
            store
                .append_report(
                    record.id,
                    &ImageReport {
                        reporter_id: UserId::new(),
                        reported_at: Utc::now(),
                        reason: "spam".to_string(),
                        detail: None,
                    },
                )
                .await
                .unwrap();
        }

        let fetched = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.reports.len(), 2);
        assert_eq!(fetched.distinct_reporters(), 2);
    }

    #[tokio::test]
    async fn test_decay_candidates_exclude_banned() {
        let store = InMemoryViolationStore::new();

        let mut striker = UserViolation::new(UserId::new());
        striker.active_strikes = 1.5;
        store.upsert(&striker).await.unwrap();

        let mut banned = UserViolation::new(UserId::new());
        banned.active_strikes = 4.0;
        banned.permanently_banned = true;
        store.upsert(&banned).await.unwrap();

        let candidates = store.find_decay_candidates(10).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].user_id, striker.user_id);
    }
}
