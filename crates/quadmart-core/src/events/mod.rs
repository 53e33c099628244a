//! Domain events emitted by the moderation pipeline.
//!
//! Events replace serialized callbacks in job payloads: the worker emits a
//! [`ModerationEvent`] on a broadcast channel and subscribers (listing
//! visibility updates, user notifications) consume it out of band.

pub mod moderation;

pub use moderation::ModerationEvent;
