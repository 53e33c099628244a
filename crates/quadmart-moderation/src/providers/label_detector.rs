//! Label-detector provider: percentage confidences routed to categories.

use std::collections::HashMap;

use serde::Deserialize;

use quadmart_core::config::moderation::ProviderConfig;
use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_entity::moderation::category::ModerationCategory;

use super::{build_client, ModerationProvider, ScoreResult};

/// Provider returning labeled detections with percentage confidences.
///
/// Confidences are divided by 100 onto the shared scale; label names are
/// routed to categories through a keyword table and each category keeps
/// its highest-confidence hit. Labels that route nowhere still appear in
/// the label list.
pub struct LabelDetectorProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LabelDetectorResponse {
    #[serde(default)]
    labels: Vec<DetectedLabel>,
}

#[derive(Debug, Deserialize)]
struct DetectedLabel {
    name: String,
    /// Percentage confidence, 0..100.
    confidence: f64,
}

impl LabelDetectorProvider {
    /// Create a provider from its configuration.
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client: build_client(config)?,
        })
    }

    fn normalize(response: LabelDetectorResponse) -> ScoreResult {
        let mut scores: HashMap<ModerationCategory, f64> = HashMap::new();
        let mut labels = Vec::with_capacity(response.labels.len());

        for detected in response.labels {
            let score = (detected.confidence / 100.0).clamp(0.0, 1.0);
            if let Some(category) = route_label(&detected.name) {
                let entry = scores.entry(category).or_insert(0.0);
                if score > *entry {
                    *entry = score;
                }
            }
            labels.push(detected.name);
        }

        ScoreResult {
            scores,
            labels,
            provider: "label_detector".to_string(),
        }
    }
}

/// Route a label name to a moderation category by keyword.
fn route_label(name: &str) -> Option<ModerationCategory> {
    let name = name.to_lowercase();
    let table: &[(&[&str], ModerationCategory)] = &[
        (
            &["nude", "nudity", "explicit", "lingerie", "underwear"],
            ModerationCategory::Nudity,
        ),
        (
            &["blood", "gore", "violence", "corpse", "injury"],
            ModerationCategory::Violence,
        ),
        (
            &["hate symbol", "swastika", "hate"],
            ModerationCategory::Hate,
        ),
        (
            &["qr code", "watermark", "advertisement", "spam"],
            ModerationCategory::Spam,
        ),
        (
            &["drug", "pill", "syringe", "cannabis", "marijuana"],
            ModerationCategory::Drugs,
        ),
        (
            &["weapon", "gun", "rifle", "pistol", "knife", "firearm"],
            ModerationCategory::Weapons,
        ),
    ];
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| name.contains(kw)))
        .map(|(_, category)| *category)
}

#[async_trait::async_trait]
impl ModerationProvider for LabelDetectorProvider {
    fn name(&self) -> &str {
        "label_detector"
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
            AppError::with_source(
                ErrorKind::ExternalService,
                "label_detector request failed",
                e,
            )
        })?;
        if !response.status().is_success() {
            return Err(AppError::external_service(format!(
                "label_detector returned {}",
                response.status()
            )));
        }

        let body: LabelDetectorResponse = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                "label_detector bad response body",
                e,
            )
        })?;
        Ok(Self::normalize(body))
    }
}
