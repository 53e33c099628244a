//! Core traits implemented by other Quadmart crates.

pub mod object_store;

pub use object_store::ObjectStore;
