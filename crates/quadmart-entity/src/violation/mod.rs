//! Per-user enforcement ledger entity and related enumerations.

pub mod model;
pub mod types;

pub use model::{UserViolation, ViolationEntry, WarningRecord};
pub use types::{AccountStatus, EnforcementAction, Severity, ViolationType};
