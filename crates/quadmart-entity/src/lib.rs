//! # quadmart-entity
//!
//! Domain entity models for the Quadmart moderation pipeline. Every struct
//! in this crate represents a database table row or a domain value object.
//! All entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod job;
pub mod moderation;
pub mod violation;
