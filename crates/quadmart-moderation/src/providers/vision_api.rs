//! Vision-API style provider: discrete likelihood buckets per category.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use quadmart_core::config::moderation::ProviderConfig;
use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_entity::moderation::category::ModerationCategory;

use super::{build_client, ModerationProvider, ScoreResult};

/// Provider returning a discrete likelihood bucket per category, mapped
/// onto the shared scale:
///
/// | bucket          | score |
/// |-----------------|-------|
/// | `VERY_UNLIKELY` | 0.05  |
/// | `UNLIKELY`      | 0.20  |
/// | `POSSIBLE`      | 0.50  |
/// | `LIKELY`        | 0.80  |
/// | `VERY_LIKELY`   | 0.95  |
///
/// Unknown buckets map to the conservative mid-point 0.5; unknown
/// category keys are dropped.
pub struct VisionApiProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VisionApiResponse {
    #[serde(default)]
    likelihoods: HashMap<String, String>,
    #[serde(default)]
    labels: Vec<String>,
}

impl VisionApiProvider {
    /// Create a provider from its configuration.
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client: build_client(config)?,
        })
    }

    fn normalize(response: VisionApiResponse) -> ScoreResult {
        let mut scores = HashMap::new();
        for (key, bucket) in &response.likelihoods {
            let Ok(category) = key.parse::<ModerationCategory>() else {
                debug!(key, "Dropping unknown vision-api category");
                continue;
            };
            scores.insert(category, likelihood_score(bucket));
        }
        ScoreResult {
            scores,
            labels: response.labels,
            provider: "vision_api".to_string(),
        }
    }
}

fn likelihood_score(bucket: &str) -> f64 {
    match bucket {
        "VERY_UNLIKELY" => 0.05,
        "UNLIKELY" => 0.2,
        "POSSIBLE" => 0.5,
        "LIKELY" => 0.8,
        "VERY_LIKELY" => 0.95,
        _ => 0.5,
    }
}

#[async_trait::async_trait]
impl ModerationProvider for VisionApiProvider {
    fn name(&self) -> &str {
        "vision_api"
    }

    async fn moderate(&self, image: &[u8]) -> AppResult<ScoreResult> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "vision_api request failed", e)
        })?;
        if !response.status().is_success() {
            return Err(AppError::external_service(format!(
                "vision_api returned {}",
                response.status()
            )));
        }

        let body: VisionApiResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "vision_api bad response body", e)
        })?;
        Ok(Self::normalize(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likelihood_bucket_mapping() {
        assert_eq!(likelihood_score("VERY_UNLIKELY"), 0.05);
        assert_eq!(likelihood_score("POSSIBLE"), 0.5);
        assert_eq!(likelihood_score("VERY_LIKELY"), 0.95);
        assert_eq!(likelihood_score("SOMETHING_NEW"), 0.5);
    }

    #[test]
    fn test_normalize_drops_unknown_categories() {
        let response = VisionApiResponse {
            likelihoods: HashMap::from([
                ("nudity".to_string(), "LIKELY".to_string()),
                ("medical".to_string(), "VERY_LIKELY".to_string()),
            ]),
            labels: vec!["Person".to_string()],
        };
        let result = VisionApiProvider::normalize(response);
        assert_eq!(result.scores.len(), 1);
        assert_eq!(result.scores[&ModerationCategory::Nudity], 0.8);
        assert_eq!(result.labels, vec!["Person".to_string()]);
    }
}
