//! # quadmart-moderation
//!
//! The moderation core: provider adapters over external content
//! classifiers, the threshold decision engine, the enforcement engine
//! (strikes, suspensions, bans), the pipeline service tying them
//! together, and a bounded in-memory queue variant for single-instance
//! deployments.

pub mod context;
pub mod decision;
pub mod enforcement;
pub mod memory_queue;
pub mod memory_store;
pub mod providers;
pub mod relevance;
pub mod service;
pub mod stores;

pub use context::PipelineContext;
pub use decision::{decide, DecisionOutcome, DecisionThresholds};
pub use enforcement::{EnforcementEngine, EnforcementOutcome, NewViolation, UploadPermission};
pub use memory_queue::{InMemoryModerationQueue, MemoryQueueStats};
pub use providers::{build_providers, ModerationProvider, ScoreResult};
pub use service::{ModerationService, PipelineResult, ScoredModeration};
pub use stores::{AuditSink, ModerationStore, RecordVerdict, ViolationStore};
