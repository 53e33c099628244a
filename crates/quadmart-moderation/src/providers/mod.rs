//! Moderation provider adapters.
//!
//! Each concrete provider normalizes its native output (likelihood
//! buckets, percentage confidences, or model-generated categorical
//! scores) onto the shared 0..1 scale.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use quadmart_core::config::moderation::{ModerationConfig, ProviderConfig};
use quadmart_core::error::AppError;
use quadmart_core::result::AppResult;
use quadmart_entity::moderation::category::ModerationCategory;

pub mod label_detector;
pub mod vision_api;
pub mod vision_llm;

pub use label_detector::LabelDetectorProvider;
pub use vision_api::VisionApiProvider;
pub use vision_llm::VisionLlmProvider;

/// Normalized output of one provider call.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// Per-category risk scores on the 0..1 scale.
    pub scores: HashMap<ModerationCategory, f64>,
    /// Detected labels, in provider order.
    pub labels: Vec<String>,
    /// The provider that produced this result.
    pub provider: String,
}

/// A content-classification backend.
#[async_trait]
pub trait ModerationProvider: Send + Sync + 'static {
    /// Provider name, recorded on the moderation record.
    fn name(&self) -> &str;

    /// Classify one image and return normalized scores plus labels.
    async fn moderate(&self, image: &[u8]) -> AppResult<ScoreResult>;
}

/// Build the configured providers, highest priority first.
pub fn build_providers(
    config: &ModerationConfig,
) -> AppResult<Vec<Arc<dyn ModerationProvider>>> {
    let mut configs: Vec<&ProviderConfig> = config.providers.iter().collect();
    configs.sort_by_key(|p| std::cmp::Reverse(p.priority));

    let mut providers: Vec<Arc<dyn ModerationProvider>> = Vec::with_capacity(configs.len());
    for provider_config in configs {
        let provider: Arc<dyn ModerationProvider> = match provider_config.kind.as_str() {
            "vision_api" => Arc::new(VisionApiProvider::new(provider_config)?),
            "label_detector" => Arc::new(LabelDetectorProvider::new(provider_config)?),
            "vision_llm" => Arc::new(VisionLlmProvider::new(provider_config)?),
            other => {
                return Err(AppError::configuration(format!(
                    "unknown moderation provider kind: {other}"
                )))
            }
        };
        providers.push(provider);
    }
    Ok(providers)
}

/// Build a reqwest client with the provider's timeout applied.
pub(crate) fn build_client(config: &ProviderConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| {
            AppError::with_source(
                quadmart_core::error::ErrorKind::Configuration,
                "Failed to build provider HTTP client",
                e,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(kind: &str, priority: i32) -> ProviderConfig {
        ProviderConfig {
            kind: kind.to_string(),
            endpoint: "http://localhost:9/moderate".to_string(),
            api_key: None,
            timeout_seconds: 1,
            priority,
        }
    }

    #[test]
    fn test_providers_sorted_by_priority() {
        let config = ModerationConfig {
            providers: vec![
                provider_config("label_detector", 1),
                provider_config("vision_api", 10),
                provider_config("vision_llm", 5),
            ],
            ..ModerationConfig::default()
        };
        let providers = build_providers(&config).expect("build");
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["vision_api", "vision_llm", "label_detector"]);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let config = ModerationConfig {
            providers: vec![provider_config("palm_reader", 0)],
            ..ModerationConfig::default()
        };
        assert!(build_providers(&config).is_err());
    }

    #[test]
    fn test_empty_provider_list_is_valid() {
        let providers = build_providers(&ModerationConfig::default()).expect("build");
        assert!(providers.is_empty());
    }
}
