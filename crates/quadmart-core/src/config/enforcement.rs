//! Enforcement strike weights, tier thresholds, and decay configuration.

use serde::{Deserialize, Serialize};

/// Enforcement engine configuration.
///
/// The tier thresholds overlap with the strike weights such that a single
/// critical violation (weight 3.0) lands a clean user directly at the
/// second suspension tier. That cliff is intentional and preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    /// Strike weight for a low-severity violation.
    #[serde(default = "default_weight_low")]
    pub weight_low: f64,
    /// Strike weight for a medium-severity violation.
    #[serde(default = "default_weight_medium")]
    pub weight_medium: f64,
    /// Strike weight for a high-severity violation.
    #[serde(default = "default_weight_high")]
    pub weight_high: f64,
    /// Strike weight for a critical-severity violation.
    #[serde(default = "default_weight_critical")]
    pub weight_critical: f64,
    /// Active strikes at which a formal warning is issued.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    /// Active strikes at which the first (24h) suspension is issued.
    #[serde(default = "default_suspension_1_threshold")]
    pub suspension_1_threshold: f64,
    /// Active strikes at which the escalating suspension tier begins.
    #[serde(default = "default_suspension_2_threshold")]
    pub suspension_2_threshold: f64,
    /// Active strikes at which the user is permanently banned.
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: f64,
    /// Days of good behavior per decay block.
    #[serde(default = "default_decay_days")]
    pub decay_block_days: i64,
    /// Active strikes removed per full decay block.
    #[serde(default = "default_decay_per_block")]
    pub decay_per_block: f64,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            weight_low: default_weight_low(),
            weight_medium: default_weight_medium(),
            weight_high: default_weight_high(),
            weight_critical: default_weight_critical(),
            warning_threshold: default_warning_threshold(),
            suspension_1_threshold: default_suspension_1_threshold(),
            suspension_2_threshold: default_suspension_2_threshold(),
            ban_threshold: default_ban_threshold(),
            decay_block_days: default_decay_days(),
            decay_per_block: default_decay_per_block(),
        }
    }
}

fn default_weight_low() -> f64 {
    0.5
}

fn default_weight_medium() -> f64 {
    1.0
}

fn default_weight_high() -> f64 {
    2.0
}

fn default_weight_critical() -> f64 {
    3.0
}

fn default_warning_threshold() -> f64 {
    1.0
}

fn default_suspension_1_threshold() -> f64 {
    2.0
}

fn default_suspension_2_threshold() -> f64 {
    3.0
}

fn default_ban_threshold() -> f64 {
    4.0
}

fn default_decay_days() -> i64 {
    30
}

fn default_decay_per_block() -> f64 {
    0.5
}
