//! FoodData Central client: cheap candidate search and single-item detail fetch

use crate::energy::{record_from_detail, REQUESTED_NUTRIENTS};
use crate::error::{NutritionError, Result};
use crate::ranking::rank_candidates;
use async_trait::async_trait;
use morsel_core::{NutritionCandidate, NutritionConfig, NutritionRecord};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const SEARCH_DATA_TYPES: &str = "Foundation,Survey (FNDDS),SR Legacy";
const MAX_PAGE_SIZE: usize = 50;
const SERVICE_NAME: &str = "FoodData Central";

/// External nutrition database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NutritionDatabase: Send + Sync {
    /// Up to `max_results` candidates for `query`, best ranked first.
    async fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<NutritionCandidate>>;

    /// Full nutrition record for one candidate, fetched by its external id.
    async fn get_nutrition_detail(&self, candidate: &NutritionCandidate) -> Result<NutritionRecord>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data_type: Option<String>,
}

pub struct UsdaClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl UsdaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(8),
        }
    }

    pub fn from_config(config: &NutritionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NutritionError::MissingApiKey(SERVICE_NAME.to_string()))?;
        Ok(Self::new(&config.base_url, api_key).with_timeout(config.request_timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let key_prefix: String = self.api_key.chars().take(4).collect();
        debug!("GET {} with key {}***", url, key_prefix);

        let response = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(NutritionError::RateLimit);
        }
        if status == 401 || status == 403 {
            return Err(NutritionError::AuthenticationFailed(SERVICE_NAME.to_string()));
        }
        if status == 404 {
            return Err(NutritionError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(500).collect();
            return Err(NutritionError::InvalidResponse(format!("HTTP {}: {}", status, text)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NutritionDatabase for UsdaClient {
    async fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<NutritionCandidate>> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let page_size = (max_results * 2).min(MAX_PAGE_SIZE);
        let url = format!("{}/foods/search", self.base_url);
        let body = self
            .get_json(
                &url,
                &[
                    ("query", query.to_string()),
                    ("dataType", SEARCH_DATA_TYPES.to_string()),
                    ("pageSize", page_size.to_string()),
                    ("pageNumber", "1".to_string()),
                    ("sortBy", "dataType.keyword".to_string()),
                    ("sortOrder", "asc".to_string()),
                ],
            )
            .await?;

        let parsed: SearchResponse = serde_json::from_value(body)?;
        let mut candidates: Vec<NutritionCandidate> = parsed
            .foods
            .into_iter()
            .map(|food| NutritionCandidate {
                external_id: food.fdc_id.to_string(),
                description: food.description,
                data_type: food.data_type.unwrap_or_default(),
            })
            .collect();

        debug!("{} candidates for '{}'", candidates.len(), query);
        rank_candidates(&mut candidates, query);
        candidates.truncate(max_results);
        Ok(candidates)
    }

    async fn get_nutrition_detail(&self, candidate: &NutritionCandidate) -> Result<NutritionRecord> {
        let id = candidate.external_id.as_str();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(NutritionError::InvalidResponse(format!("Invalid food id: {:?}", id)));
        }

        let url = format!("{}/food/{}", self.base_url, id);
        let body = self
            .get_json(
                &url,
                &[
                    ("format", "abridged".to_string()),
                    ("nutrients", REQUESTED_NUTRIENTS.to_string()),
                ],
            )
            .await?;

        let record = record_from_detail(id, &candidate.description, &body);
        debug!(
            "Nutrition for {}: '{}' {:.1} kcal/100g",
            id, record.description, record.calories_per_100g
        );
        Ok(record)
    }
}
