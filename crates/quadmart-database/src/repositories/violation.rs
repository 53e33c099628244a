//! User violation ledger repository.

use sqlx::types::Json;
use sqlx::PgPool;

use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_core::types::id::UserId;
use quadmart_entity::violation::model::UserViolation;

/// Repository for the per-user enforcement ledger.
///
/// The ledger is one row per user; every mutation is a whole-row upsert so
/// the entity's invariants are enforced within a single document.
#[derive(Debug, Clone)]
pub struct ViolationRepository {
    pool: PgPool,
}

impl ViolationRepository {
    /// Create a new violation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a user's ledger, if one exists.
    pub async fn get(&self, user_id: UserId) -> AppResult<Option<UserViolation>> {
        sqlx::query_as::<_, UserViolation>("SELECT * FROM user_violations WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to fetch violation ledger", e)
            })
    }

    /// Insert or fully replace a user's ledger.
    pub async fn upsert(&self, ledger: &UserViolation) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_violations (user_id, total_violations, active_strikes, \
             lifetime_strikes, account_status, suspended_until, suspension_reason, \
             permanently_banned, ban_reason, banned_at, suspension_count, entries, warnings, \
             images_uploaded, images_rejected, images_reported, rejection_rate, \
             last_violation_at, good_behavior_days, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET \
             total_violations = EXCLUDED.total_violations, \
             active_strikes = EXCLUDED.active_strikes, \
             lifetime_strikes = EXCLUDED.lifetime_strikes, \
             account_status = EXCLUDED.account_status, \
             suspended_until = EXCLUDED.suspended_until, \
             suspension_reason = EXCLUDED.suspension_reason, \
             permanently_banned = EXCLUDED.permanently_banned, \
             ban_reason = EXCLUDED.ban_reason, \
             banned_at = EXCLUDED.banned_at, \
             suspension_count = EXCLUDED.suspension_count, \
             entries = EXCLUDED.entries, \
             warnings = EXCLUDED.warnings, \
             images_uploaded = EXCLUDED.images_uploaded, \
             images_rejected = EXCLUDED.images_rejected, \
             images_reported = EXCLUDED.images_reported, \
             rejection_rate = EXCLUDED.rejection_rate, \
             last_violation_at = EXCLUDED.last_violation_at, \
             good_behavior_days = EXCLUDED.good_behavior_days, \
             updated_at = NOW()",
        )
        .bind(ledger.user_id)
        .bind(ledger.total_violations)
        .bind(ledger.active_strikes)
        .bind(ledger.lifetime_strikes)
        .bind(ledger.account_status)
        .bind(ledger.suspended_until)
        .bind(&ledger.suspension_reason)
        .bind(ledger.permanently_banned)
        .bind(&ledger.ban_reason)
        .bind(ledger.banned_at)
        .bind(ledger.suspension_count)
        .bind(Json(&ledger.entries.0))
        .bind(Json(&ledger.warnings.0))
        .bind(ledger.images_uploaded)
        .bind(ledger.images_rejected)
        .bind(ledger.images_reported)
        .bind(ledger.rejection_rate)
        .bind(ledger.last_violation_at)
        .bind(ledger.good_behavior_days)
        .bind(ledger.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert violation ledger", e)
        })?;
        Ok(())
    }

    /// Ledgers with decayable strikes, for the periodic decay sweep.
    pub async fn find_decay_candidates(&self, limit: i64) -> AppResult<Vec<UserViolation>> {
        sqlx::query_as::<_, UserViolation>(
            "SELECT * FROM user_violations \
             WHERE active_strikes > 0 AND NOT permanently_banned \
             ORDER BY last_violation_at ASC NULLS FIRST LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list decay candidates", e)
        })
    }
}
