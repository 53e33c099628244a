//! Moderation record entity model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use quadmart_core::types::id::{ImageId, ItemId, ModerationRecordId, UserId};

use super::category::ModerationCategory;
use super::status::{ModerationDecision, ModerationStatus};

/// One image's moderation lifecycle.
///
/// Created when an image enters the pipeline, mutated by the decision
/// engine and manual reviewer actions, never deleted (retained for audit).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModerationRecord {
    /// Unique record identifier.
    pub id: ModerationRecordId,
    /// The uploaded image.
    pub image_id: ImageId,
    /// The item listing the image belongs to.
    pub item_id: ItemId,
    /// The uploading user.
    pub user_id: UserId,
    /// Temporary URL the image was uploaded to.
    pub temp_url: Option<String>,
    /// Permanent URL, set only on approval.
    pub permanent_url: Option<String>,
    /// Perceptual hash of the preprocessed image.
    pub perceptual_hash: Option<String>,
    /// Current lifecycle status.
    pub status: ModerationStatus,
    /// Automated decision, once scored.
    pub decision: Option<ModerationDecision>,
    /// Per-category AI risk scores on the 0..1 scale.
    pub ai_scores: Json<HashMap<ModerationCategory, f64>>,
    /// Provider that produced the scores (`"NONE"` if all failed).
    pub provider: Option<String>,
    /// Detected labels; unique within one record.
    pub labels: Json<Vec<String>>,
    /// Deduplicated rejection reason codes.
    pub rejection_reasons: Json<Vec<String>>,
    /// Manual review outcome, if one happened.
    pub manual_review: Option<Json<ManualReview>>,
    /// User reports filed against this image.
    pub reports: Json<Vec<ImageReport>>,
    /// Image metadata captured at validation time.
    pub metadata: Option<Json<ImageMeta>>,
    /// Number of processing attempts.
    pub attempts: i32,
    /// When the record was last processed.
    pub last_processed_at: Option<DateTime<Utc>>,
    /// Last processing error, if any.
    pub error_message: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ModerationRecord {
    /// Whether this record has reached an automated terminal decision.
    pub fn is_decided(&self) -> bool {
        matches!(
            self.status,
            ModerationStatus::Approved | ModerationStatus::Rejected
        )
    }

    /// Number of distinct reporters on this record.
    pub fn distinct_reporters(&self) -> usize {
        let mut reporters: Vec<UserId> = self.reports.iter().map(|r| r.reporter_id).collect();
        reporters.sort_by_key(|id| *id.as_uuid());
        reporters.dedup();
        reporters.len()
    }
}

/// Outcome of a manual review by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualReview {
    /// The reviewing admin.
    pub reviewer_id: UserId,
    /// When the review concluded.
    pub reviewed_at: DateTime<Utc>,
    /// Free-text reviewer notes.
    pub notes: Option<String>,
    /// The reviewer's final decision.
    pub final_decision: ModerationDecision,
}

/// A user report filed against an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    /// The reporting user.
    pub reporter_id: UserId,
    /// When the report was filed.
    pub reported_at: DateTime<Utc>,
    /// Report reason code.
    pub reason: String,
    /// Optional free-text detail.
    pub detail: Option<String>,
}

/// Image metadata captured at validation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Detected input format (e.g. `"jpeg"`).
    pub format: String,
    /// Size in bytes of the original upload.
    pub size_bytes: u64,
    /// Whether embedded metadata (EXIF/XMP/IPTC) was present.
    pub has_exif: bool,
}

/// Data required to create a new moderation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModerationRecord {
    /// The uploaded image.
    pub image_id: ImageId,
    /// The item listing the image belongs to.
    pub item_id: ItemId,
    /// The uploading user.
    pub user_id: UserId,
    /// Temporary URL the image was uploaded to.
    pub temp_url: Option<String>,
}
