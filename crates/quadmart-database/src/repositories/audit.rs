//! Audit log repository (append-only).

use sqlx::PgPool;

use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_core::types::id::{AuditLogId, UserId};
use quadmart_entity::audit::model::{AuditLogEntry, CreateAuditLogEntry};

/// Repository for the append-only audit log.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry. Entries are never updated or deleted.
    pub async fn append(&self, data: &CreateAuditLogEntry) -> AppResult<AuditLogEntry> {
        sqlx::query_as::<_, AuditLogEntry>(
            "INSERT INTO audit_log (id, action, image_id, item_id, user_id, actor_type, \
             actor_id, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(AuditLogId::new())
        .bind(&data.action)
        .bind(data.image_id)
        .bind(data.item_id)
        .bind(data.user_id)
        .bind(data.actor_type)
        .bind(&data.actor_id)
        .bind(&data.details)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to append audit entry", e)
        })
    }

    /// Recent entries for one user, newest first.
    pub async fn find_by_user(&self, user_id: UserId, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list audit entries", e)
        })
    }

    /// Most recent entries across all users.
    pub async fn find_recent(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list recent audit entries", e)
        })
    }
}
