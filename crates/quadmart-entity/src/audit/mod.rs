//! Audit log entry entity.

pub mod model;

pub use model::{ActorType, AuditLogEntry, CreateAuditLogEntry};
