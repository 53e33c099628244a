//! # quadmart-database
//!
//! PostgreSQL persistence for the Quadmart moderation pipeline: connection
//! pool management, migrations, and per-entity repositories. All queries
//! are runtime-checked `query_as` calls; entity structs derive
//! `sqlx::FromRow`.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
