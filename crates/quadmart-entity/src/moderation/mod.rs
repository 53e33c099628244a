//! Moderation record entity and related enumerations.

pub mod category;
pub mod model;
pub mod status;

pub use category::ModerationCategory;
pub use model::{CreateModerationRecord, ImageMeta, ImageReport, ManualReview, ModerationRecord};
pub use status::{ModerationDecision, ModerationStatus};
