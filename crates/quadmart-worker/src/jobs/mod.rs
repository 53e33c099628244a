//! Built-in job handler implementations.

pub mod cleanup;
pub mod email;
pub mod image_process;

pub use cleanup::CleanupJobHandler;
pub use email::{EmailJobHandler, EmailSender, LogEmailSender};
pub use image_process::{ImageProcessJobHandler, ImageProcessPayload};
