//! User violation ledger entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use quadmart_core::types::id::{ImageId, ItemId, UserId};

use super::types::{AccountStatus, EnforcementAction, Severity, ViolationType};

/// Per-user enforcement ledger.
///
/// Created lazily on a user's first violation, mutated by the enforcement
/// engine on every new violation and by the periodic decay process, never
/// deleted. Lifetime strikes are monotonic; active strikes decay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserViolation {
    /// The user this ledger belongs to (unique key).
    pub user_id: UserId,
    /// Total violation count.
    pub total_violations: i32,
    /// Active (decayable) strikes.
    pub active_strikes: f64,
    /// Lifetime (monotonic) strikes.
    pub lifetime_strikes: f64,
    /// Current account standing.
    pub account_status: AccountStatus,
    /// Suspension window end, while suspended.
    pub suspended_until: Option<DateTime<Utc>>,
    /// Reason for the current/last suspension.
    pub suspension_reason: Option<String>,
    /// Permanent-ban flag.
    pub permanently_banned: bool,
    /// Reason for the permanent ban.
    pub ban_reason: Option<String>,
    /// When the permanent ban was applied.
    pub banned_at: Option<DateTime<Utc>>,
    /// Count of prior suspensions (drives escalating durations).
    pub suspension_count: i32,
    /// Ordered individual violation entries.
    pub entries: Json<Vec<ViolationEntry>>,
    /// Ordered warnings sent to the user.
    pub warnings: Json<Vec<WarningRecord>>,
    /// Aggregate: images uploaded.
    pub images_uploaded: i32,
    /// Aggregate: images rejected.
    pub images_rejected: i32,
    /// Aggregate: images reported by other users.
    pub images_reported: i32,
    /// Rejected / uploaded ratio.
    pub rejection_rate: f64,
    /// When the last violation occurred.
    pub last_violation_at: Option<DateTime<Utc>>,
    /// Consecutive days without a violation (decay bookkeeping).
    pub good_behavior_days: i32,
    /// When the ledger was created.
    pub created_at: DateTime<Utc>,
    /// When the ledger was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserViolation {
    /// Fresh ledger for a user's first violation.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_violations: 0,
            active_strikes: 0.0,
            lifetime_strikes: 0.0,
            account_status: AccountStatus::Active,
            suspended_until: None,
            suspension_reason: None,
            permanently_banned: false,
            ban_reason: None,
            banned_at: None,
            suspension_count: 0,
            entries: Json(Vec::new()),
            warnings: Json(Vec::new()),
            images_uploaded: 0,
            images_rejected: 0,
            images_reported: 0,
            rejection_rate: 0.0,
            last_violation_at: None,
            good_behavior_days: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the suspension window (if any) has already elapsed.
    pub fn suspension_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.suspended_until {
            Some(until) => until <= now,
            None => true,
        }
    }

    /// Recompute the rejection rate from the aggregate counters.
    pub fn recompute_rejection_rate(&mut self) {
        self.rejection_rate = if self.images_uploaded > 0 {
            f64::from(self.images_rejected) / f64::from(self.images_uploaded)
        } else {
            0.0
        };
    }
}

/// One violation on a user's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEntry {
    /// The offending image, if image-linked.
    pub image_id: Option<ImageId>,
    /// The item listing involved, if any.
    pub item_id: Option<ItemId>,
    /// What kind of violation.
    pub violation_type: ViolationType,
    /// Severity band applied.
    pub severity: Severity,
    /// Action the engine took.
    pub action: EnforcementAction,
    /// Human-readable description.
    pub description: String,
    /// Who recorded the violation (`"ai"`, `"admin:<id>"`, `"system"`).
    pub actor: String,
    /// Strikes added by this entry.
    pub strikes_added: f64,
    /// When the violation was recorded.
    pub occurred_at: DateTime<Utc>,
    /// Whether the user appealed this entry.
    pub appealed: bool,
    /// Appeal notes, if appealed.
    pub appeal_notes: Option<String>,
}

/// One warning sent to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningRecord {
    /// When the warning was sent.
    pub sent_at: DateTime<Utc>,
    /// Why the warning was sent.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ledger_is_clean() {
        let ledger = UserViolation::new(UserId::new());
        assert_eq!(ledger.account_status, AccountStatus::Active);
        assert_eq!(ledger.active_strikes, 0.0);
        assert!(ledger.entries.is_empty());
    }

    #[test]
    fn test_rejection_rate() {
        let mut ledger = UserViolation::new(UserId::new());
        ledger.images_uploaded = 4;
        ledger.images_rejected = 1;
        ledger.recompute_rejection_rate();
        assert_eq!(ledger.rejection_rate, 0.25);

        ledger.images_uploaded = 0;
        ledger.recompute_rejection_rate();
        assert_eq!(ledger.rejection_rate, 0.0);
    }
}
