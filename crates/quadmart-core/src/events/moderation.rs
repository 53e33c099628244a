//! Moderation outcome events.

use serde::{Deserialize, Serialize};

use crate::types::id::{ItemId, ModerationRecordId, UserId};

/// Outcome of one image's trip through the moderation pipeline.
///
/// Carries identifiers rather than full records so the event stays cheap to
/// clone across broadcast receivers; subscribers fetch what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModerationEvent {
    /// The image was approved and uploaded to permanent storage.
    Approved {
        /// The moderation record.
        record_id: ModerationRecordId,
        /// The item the image belongs to.
        item_id: ItemId,
        /// The uploading user.
        user_id: UserId,
        /// Permanent URLs of the stored image(s).
        permanent_urls: Vec<String>,
    },
    /// The image was rejected; the owning user may have been sanctioned.
    Rejected {
        /// The moderation record.
        record_id: ModerationRecordId,
        /// The item the image belongs to.
        item_id: ItemId,
        /// The uploading user.
        user_id: UserId,
        /// Deduplicated rejection reason codes (e.g. `"NUDITY"`).
        reasons: Vec<String>,
        /// Human-readable summary shown to the submitting user.
        message: String,
    },
    /// The image needs a human decision.
    ManualReview {
        /// The moderation record.
        record_id: ModerationRecordId,
        /// The item the image belongs to.
        item_id: ItemId,
        /// The uploading user.
        user_id: UserId,
    },
}

impl ModerationEvent {
    /// The moderation record this event concerns.
    pub fn record_id(&self) -> ModerationRecordId {
        match self {
            Self::Approved { record_id, .. }
            | Self::Rejected { record_id, .. }
            | Self::ManualReview { record_id, .. } => *record_id,
        }
    }

    /// The uploading user this event concerns.
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Approved { user_id, .. }
            | Self::Rejected { user_id, .. }
            | Self::ManualReview { user_id, .. } => *user_id,
        }
    }
}
