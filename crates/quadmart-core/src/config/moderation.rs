//! Moderation provider and decision threshold configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Moderation subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Configured providers in priority order (highest priority first
    /// after sorting). An empty list is a valid, first-class state.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Per-category score at/above which content is auto-rejected.
    #[serde(default = "default_unsafe_thresholds")]
    pub unsafe_thresholds: HashMap<String, f64>,
    /// Per-category score below which content is considered clean.
    #[serde(default = "default_safe_thresholds")]
    pub safe_thresholds: HashMap<String, f64>,
    /// Distinct user reports needed before a record is auto-flagged.
    #[serde(default = "default_report_flag_threshold")]
    pub report_flag_threshold: usize,
}

/// Configuration for one external moderation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind: `"vision_api"`, `"label_detector"`, or `"vision_llm"`.
    pub kind: String,
    /// HTTP endpoint for the provider.
    pub endpoint: String,
    /// API key, if required.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    /// Priority (higher = tried sooner).
    #[serde(default)]
    pub priority: i32,
}

impl ModerationConfig {
    /// Validate the configuration invariant that every category's UNSAFE
    /// threshold is at least its SAFE threshold.
    pub fn validate(&self) -> Result<(), AppError> {
        for (category, safe) in &self.safe_thresholds {
            if let Some(unsafe_) = self.unsafe_thresholds.get(category) {
                if unsafe_ < safe {
                    return Err(AppError::configuration(format!(
                        "UNSAFE threshold for '{category}' ({unsafe_}) is below SAFE ({safe})"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            unsafe_thresholds: default_unsafe_thresholds(),
            safe_thresholds: default_safe_thresholds(),
            report_flag_threshold: default_report_flag_threshold(),
        }
    }
}

fn default_unsafe_thresholds() -> HashMap<String, f64> {
    HashMap::from([
        ("nudity".to_string(), 0.7),
        ("violence".to_string(), 0.8),
        ("hate".to_string(), 0.7),
        ("spam".to_string(), 0.9),
        ("drugs".to_string(), 0.8),
        ("weapons".to_string(), 0.85),
    ])
}

fn default_safe_thresholds() -> HashMap<String, f64> {
    HashMap::from([
        ("nudity".to_string(), 0.3),
        ("violence".to_string(), 0.4),
        ("hate".to_string(), 0.3),
        ("spam".to_string(), 0.5),
        ("drugs".to_string(), 0.4),
        ("weapons".to_string(), 0.5),
    ])
}

fn default_report_flag_threshold() -> usize {
    3
}

fn default_provider_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_are_coherent() {
        let config = ModerationConfig::default();
        config.validate().expect("defaults must satisfy UNSAFE >= SAFE");
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = ModerationConfig::default();
        config.unsafe_thresholds.insert("nudity".to_string(), 0.1);
        assert!(config.validate().is_err());
    }
}
