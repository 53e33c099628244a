//! Per-entity repository implementations.

pub mod audit;
pub mod job;
pub mod moderation;
pub mod violation;

pub use audit::AuditLogRepository;
pub use job::JobRepository;
pub use moderation::ModerationRepository;
pub use violation::ViolationRepository;
