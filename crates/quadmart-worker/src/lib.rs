//! # quadmart-worker
//!
//! Durable background job processing for the Quadmart moderation
//! pipeline:
//! - A job queue over the PostgreSQL job table, with lease-based claims
//! - A worker runner that polls for jobs and executes them one at a time
//! - A job executor that dispatches jobs to the correct handler
//! - A cron scheduler for lease recovery, strike decay, and job cleanup
//! - Built-in handlers for image moderation, email, and cleanup

pub mod executor;
pub mod jobs;
pub mod memory;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use memory::InMemoryJobStore;
pub use queue::{JobQueue, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
pub use store::JobStore;
