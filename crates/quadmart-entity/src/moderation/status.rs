//! Moderation status and decision enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a moderation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    /// Waiting to be processed.
    Pending,
    /// Approved and stored permanently.
    Approved,
    /// Rejected; enforcement side effects applied.
    Rejected,
    /// Flagged for human attention (AI uncertainty or user reports).
    Flagged,
    /// An admin is actively reviewing the record.
    Reviewing,
}

impl ModerationStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Flagged => "flagged",
            Self::Reviewing => "reviewing",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision produced by the decision engine or a manual reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    /// Scored below every SAFE threshold.
    AutoApproved,
    /// At or above at least one UNSAFE threshold.
    AutoRejected,
    /// Between SAFE and UNSAFE, or provider unavailability.
    ManualReviewRequired,
}

impl ModerationDecision {
    /// Return the decision as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApproved => "auto_approved",
            Self::AutoRejected => "auto_rejected",
            Self::ManualReviewRequired => "manual_review_required",
        }
    }
}

impl fmt::Display for ModerationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
