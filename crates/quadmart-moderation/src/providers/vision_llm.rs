//! Vision-capable language model provider: categorical scores parsed
//! out of a generated JSON response.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use quadmart_core::config::moderation::ProviderConfig;
use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_entity::moderation::category::ModerationCategory;

use super::{build_client, ModerationProvider, ScoreResult};

const PROMPT: &str = "Rate this marketplace listing photo for each category \
    (nudity, violence, hate, spam, drugs, weapons) on a 0.0-1.0 scale. \
    Respond with a single JSON object mapping category to score.";

/// Provider that asks a vision-capable model for per-category scores.
///
/// The model is instructed to answer with a JSON object; the adapter
/// extracts the first JSON object from the response text, clamps every
/// score to 0..1, and drops unknown keys. Anything unparseable is a
/// provider failure, which the service treats like any other.
pub struct VisionLlmProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    content: String,
}

impl VisionLlmProvider {
    /// Create a provider from its configuration.
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client: build_client(config)?,
        })
    }
}

/// Extract and normalize the score object from model response text.
fn parse_llm_scores(text: &str) -> AppResult<HashMap<ModerationCategory, f64>> {
    let start = text
        .find('{')
        .ok_or_else(|| AppError::external_service("vision_llm response has no JSON object"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AppError::external_service("vision_llm response has no JSON object"))?;

    let raw: HashMap<String, f64> = serde_json::from_str(&text[start..=end]).map_err(|e| {
        AppError::with_source(
            ErrorKind::ExternalService,
            "vision_llm response is not a score object",
            e,
        )
    })?;

    let mut scores = HashMap::new();
    for (key, value) in raw {
        let Ok(category) = key.parse::<ModerationCategory>() else {
            debug!(key, "Dropping unknown vision_llm category");
            continue;
        };
        scores.insert(category, value.clamp(0.0, 1.0));
    }
    Ok(scores)
}

#[async_trait::async_trait]
impl ModerationProvider for VisionLlmProvider {
    fn name(&self) -> &str {
        "vision_llm"
    }

    async fn moderate(&self, image: &[u8]) -> AppResult<ScoreResult> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/octet-stream")
            .header("X-Prompt", PROMPT)
            .body(image.to_vec());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "vision_llm request failed", e)
        })?;
        if !response.status().is_success() {
            return Err(AppError::external_service(format!(
                "vision_llm returned {}",
                response.status()
            )));
        }

        let body: LlmResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "vision_llm bad response body", e)
        })?;

        Ok(ScoreResult {
            scores: parse_llm_scores(&body.content)?,
            labels: Vec::new(),
            provider: "vision_llm".to_string(),
        })
    }
}
