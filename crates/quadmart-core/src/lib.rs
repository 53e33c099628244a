//! # quadmart-core
//!
//! Core crate for the Quadmart moderation pipeline. Contains configuration
//! schemas, typed identifiers, pipeline events, the object-store trait, and
//! the unified error system.
//!
//! This crate has **no** internal dependencies on other Quadmart crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
