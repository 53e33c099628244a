//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use quadmart_core::types::id::{AuditLogId, ImageId, ItemId, UserId};

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "actor_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// An automated moderation provider/decision.
    Ai,
    /// A human administrator.
    Admin,
    /// The system itself (sweeps, decay, cleanup).
    System,
}

impl ActorType {
    /// Return the actor type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit log entry recording one moderation or enforcement
/// decision. Append-only; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// The action that was taken (e.g., `"moderation.auto_rejected"`).
    pub action: String,
    /// The image involved, if any.
    pub image_id: Option<ImageId>,
    /// The item involved, if any.
    pub item_id: Option<ItemId>,
    /// The user involved, if any.
    pub user_id: Option<UserId>,
    /// Who performed the action.
    pub actor_type: ActorType,
    /// Actor identifier (provider name, admin id, or `"system"`).
    pub actor_id: Option<String>,
    /// Structured detail payload (JSON).
    pub details: Option<serde_json::Value>,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    /// The action taken.
    pub action: String,
    /// The image involved, if any.
    pub image_id: Option<ImageId>,
    /// The item involved, if any.
    pub item_id: Option<ItemId>,
    /// The user involved, if any.
    pub user_id: Option<UserId>,
    /// Who performed the action.
    pub actor_type: ActorType,
    /// Actor identifier.
    pub actor_id: Option<String>,
    /// Structured detail payload.
    pub details: Option<serde_json::Value>,
}
