//! Moderation record repository.

use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgPool;

use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_core::types::id::{ItemId, ModerationRecordId};
use quadmart_entity::moderation::category::ModerationCategory;
use quadmart_entity::moderation::model::{
    CreateModerationRecord, ImageMeta, ImageReport, ManualReview, ModerationRecord,
};
use quadmart_entity::moderation::status::{ModerationDecision, ModerationStatus};

/// Repository for moderation record persistence.
///
/// Records are never deleted, only status-transitioned; all mutations are
/// single-row updates.
#[derive(Debug, Clone)]
pub struct ModerationRepository {
    pool: PgPool,
}

impl ModerationRepository {
    /// Create a new moderation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new pending record for an image entering the pipeline.
    pub async fn create(&self, data: &CreateModerationRecord) -> AppResult<ModerationRecord> {
        sqlx::query_as::<_, ModerationRecord>(
            "INSERT INTO moderation_records (id, image_id, item_id, user_id, temp_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(ModerationRecordId::new())
        .bind(data.image_id)
        .bind(data.item_id)
        .bind(data.user_id)
        .bind(&data.temp_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create moderation record", e)
        })
    }

    /// Find a record by ID.
    pub async fn find_by_id(&self, id: ModerationRecordId) -> AppResult<Option<ModerationRecord>> {
        sqlx::query_as::<_, ModerationRecord>("SELECT * FROM moderation_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find moderation record", e)
            })
    }

    /// List records for one item listing.
    pub async fn find_by_item(&self, item_id: ItemId) -> AppResult<Vec<ModerationRecord>> {
        sqlx::query_as::<_, ModerationRecord>(
            "SELECT * FROM moderation_records WHERE item_id = $1 ORDER BY created_at ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list records by item", e)
        })
    }

    /// List records in a given status, oldest first.
    pub async fn list_by_status(
        &self,
        status: ModerationStatus,
        limit: i64,
    ) -> AppResult<Vec<ModerationRecord>> {
        sqlx::query_as::<_, ModerationRecord>(
            "SELECT * FROM moderation_records WHERE status = $1 ORDER BY created_at ASC LIMIT $2",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list records by status", e)
        })
    }

    /// Persist the scoring outcome of one pipeline run.
    #[allow(clippy::too_many_arguments)]
    pub async fn persist_verdict(
        &self,
        id: ModerationRecordId,
        status: ModerationStatus,
        decision: ModerationDecision,
        scores: &HashMap<ModerationCategory, f64>,
        provider: &str,
        labels: &[String],
        rejection_reasons: &[String],
        perceptual_hash: Option<&str>,
        metadata: Option<&ImageMeta>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE moderation_records SET status = $2, decision = $3, ai_scores = $4, \
             provider = $5, labels = $6, rejection_reasons = $7, perceptual_hash = $8, \
             metadata = $9, attempts = attempts + 1, last_processed_at = NOW(), \
             error_message = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(decision)
        .bind(Json(scores))
        .bind(provider)
        .bind(Json(labels))
        .bind(Json(rejection_reasons))
        .bind(perceptual_hash)
        .bind(metadata.map(Json))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to persist verdict", e))?;
        Ok(())
    }

    /// Record the permanent URL after a successful storage upload.
    pub async fn mark_approved(&self, id: ModerationRecordId, permanent_url: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE moderation_records SET status = 'approved', permanent_url = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(permanent_url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark approved", e))?;
        Ok(())
    }

    /// Record a processing error against the record.
    pub async fn mark_error(&self, id: ModerationRecordId, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE moderation_records SET attempts = attempts + 1, error_message = $2, \
             last_processed_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record error", e))?;
        Ok(())
    }

    /// Transition a record's status.
    pub async fn set_status(&self, id: ModerationRecordId, status: ModerationStatus) -> AppResult<()> {
        sqlx::query("UPDATE moderation_records SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set status", e))?;
        Ok(())
    }

    /// Attach a manual review outcome and its resulting status/decision.
    pub async fn attach_manual_review(
        &self,
        id: ModerationRecordId,
        review: &ManualReview,
        status: ModerationStatus,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE moderation_records SET manual_review = $2, status = $3, decision = $4, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(review))
        .bind(status)
        .bind(review.final_decision)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to attach manual review", e)
        })?;
        Ok(())
    }

    /// Append one user report to the record (atomic JSONB concatenation).
    pub async fn append_report(&self, id: ModerationRecordId, report: &ImageReport) -> AppResult<()> {
        sqlx::query(
            "UPDATE moderation_records SET reports = reports || $2::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(vec![report]))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append report", e))?;
        Ok(())
    }
}
