//! Background job entity and status enumerations.

pub mod model;
pub mod status;

pub use model::{CreateJob, Job};
pub use status::{JobStatus, JobType};
