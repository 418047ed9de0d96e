//! OpenAI-compatible embeddings endpoint

use super::EmbeddingProvider;
use crate::error::{NutritionError, Result};
use async_trait::async_trait;
use morsel_core::EmbeddingConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const MAX_DIMENSION: usize = 10_000;

pub struct RemoteEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl RemoteEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NutritionError::MissingApiKey("embeddings".to_string()))?;
        Ok(Self::new(&config.remote_base_url, &config.remote_model, api_key))
    }

    fn parse_embedding(body: &Value) -> Result<Vec<f32>> {
        let values = body["data"]
            .get(0)
            .and_then(|item| item["embedding"].as_array())
            .ok_or_else(|| NutritionError::InvalidResponse("No embedding in response".to_string()))?;

        if values.is_empty() {
            return Err(NutritionError::InvalidResponse("Empty embedding".to_string()));
        }
        if values.len() > MAX_DIMENSION {
            return Err(NutritionError::InvalidResponse("Embedding dimension too large".to_string()));
        }

        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .filter(|x| x.is_finite())
                    .map(|x| x as f32)
                    .ok_or_else(|| NutritionError::InvalidResponse("Non-numeric embedding value".to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key_prefix: String = self.api_key.chars().take(4).collect();
        debug!("Embedding request to {} with key {}***", self.base_url, key_prefix);

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&json!({ "model": self.model, "input": [text] }))
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(NutritionError::RateLimit);
        }
        if status == 401 || status == 403 {
            return Err(NutritionError::AuthenticationFailed("embeddings".to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(500).collect();
            return Err(NutritionError::InvalidResponse(format!("HTTP {}: {}", status, text)));
        }

        let body: Value = response.json().await?;
        Self::parse_embedding(&body)
    }
}
