//! Two-phase nutrition matching: search, semantic pick, single detail fetch

use crate::cache::CachedEmbedder;
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use crate::usda::NutritionDatabase;
use morsel_core::labels::clean_query;
use morsel_core::{NutritionCandidate, NutritionConfig, NutritionRecord};
use std::sync::Arc;
use tracing::{debug, info};

/// An accepted match for a detected label.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionMatch {
    pub record: NutritionRecord,
    pub similarity: f32,
}

pub struct NutritionMatcher {
    database: Arc<dyn NutritionDatabase>,
    embedder: Arc<CachedEmbedder>,
    max_candidates: usize,
    min_similarity: f32,
}

impl NutritionMatcher {
    pub fn new(database: Arc<dyn NutritionDatabase>, embedder: Arc<CachedEmbedder>, config: &NutritionConfig) -> Self {
        Self {
            database,
            embedder,
            max_candidates: config.max_candidates,
            min_similarity: config.min_similarity,
        }
    }

    /// Resolve a detector label to a nutrition record.
    ///
    /// `Ok(None)` means the label is not food: no candidates were found, or
    /// none is semantically close enough. At most one detail fetch is made.
    pub async fn match_food(&self, label: &str) -> Result<Option<NutritionMatch>> {
        let query = clean_query(label);
        if query.is_empty() {
            debug!("Label '{}' has nothing left to search for", label);
            return Ok(None);
        }

        let candidates = self.database.search_candidates(&query, self.max_candidates).await?;
        if candidates.is_empty() {
            debug!("No nutrition candidates for '{}'", query);
            return Ok(None);
        }

        let Some((candidate, similarity)) = self.best_candidate(&query, &candidates).await? else {
            return Ok(None);
        };

        if similarity < self.min_similarity {
            info!(
                "'{}' is not food: best match '{}' at {:.3} is below {:.2}",
                label, candidate.description, similarity, self.min_similarity
            );
            return Ok(None);
        }

        info!("Matched '{}' → '{}' (cosine {:.3})", label, candidate.description, similarity);
        let record = self.database.get_nutrition_detail(candidate).await?;
        Ok(Some(NutritionMatch { record, similarity }))
    }

    /// Candidate with the highest cosine similarity to `query`. Ties keep
    /// the earlier (better ranked) candidate.
    pub async fn best_candidate<'a>(
        &self,
        query: &str,
        candidates: &'a [NutritionCandidate],
    ) -> Result<Option<(&'a NutritionCandidate, f32)>> {
        let query_vec = self.embedder.embed(query).await?;
        let mut best: Option<(&NutritionCandidate, f32)> = None;

        for candidate in candidates {
            let candidate_vec = self.embedder.embed(&candidate.description).await?;
            let similarity = cosine_similarity(&query_vec, &candidate_vec)?;
            debug!("  '{}' → {:.3}", candidate.description, similarity);

            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((candidate, similarity));
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::error::NutritionError;
    use crate::usda::MockNutritionDatabase;
    use morsel_core::NutrientProfile;

    fn candidate(id: &str, description: &str) -> NutritionCandidate {
        NutritionCandidate {
            external_id: id.to_string(),
            description: description.to_string(),
            data_type: "Foundation".to_string(),
        }
    }

    /// Embeds known words onto fixed axes.
    fn embedder() -> Arc<CachedEmbedder> {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed().returning(|text| {
            let text = text.to_lowercase();
            Ok(if text.contains("apple") {
                vec![1.0, 0.0, 0.0]
            } else if text.contains("pie") {
                vec![0.6, 0.8, 0.0]
            } else {
                vec![0.0, 0.0, 1.0]
            })
        });
        Arc::new(CachedEmbedder::new(Arc::new(provider), 64))
    }

    fn matcher(database: MockNutritionDatabase) -> NutritionMatcher {
        NutritionMatcher::new(Arc::new(database), embedder(), &NutritionConfig::default())
    }

    #[tokio::test]
    async fn test_match_fetches_only_the_winner() {
        let mut database = MockNutritionDatabase::new();
        database
            .expect_search_candidates()
            .withf(|query, max| query == "apple" && *max == 10)
            .times(1)
            .returning(|_, _| Ok(vec![candidate("pie", "Pie crust"), candidate("171688", "Apples, raw")]));
        database
            .expect_get_nutrition_detail()
            .withf(|c| c.external_id == "171688")
            .times(1)
            .returning(|c| {
                Ok(NutritionRecord {
                    external_id: c.external_id.clone(),
                    description: c.description.clone(),
                    calories_per_100g: 52.0,
                    nutrients: NutrientProfile::default(),
                })
            });

        let matched = matcher(database).match_food("Fresh Apple").await.unwrap().unwrap();
        assert_eq!(matched.record.calories_per_100g, 52.0);
        assert!((matched.similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_no_candidates_is_not_food() {
        let mut database = MockNutritionDatabase::new();
        database.expect_search_candidates().returning(|_, _| Ok(vec![]));
        database.expect_get_nutrition_detail().never();

        assert!(matcher(database).match_food("Tableware").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_low_similarity_is_not_food() {
        let mut database = MockNutritionDatabase::new();
        database
            .expect_search_candidates()
            .returning(|_, _| Ok(vec![candidate("1", "Apples, raw")]));
        database.expect_get_nutrition_detail().never();

        // "plate" embeds orthogonally to "apple"
        assert!(matcher(database).match_food("Plate").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similarity_threshold_is_inclusive() {
        let mut database = MockNutritionDatabase::new();
        database
            .expect_search_candidates()
            .returning(|_, _| Ok(vec![candidate("1", "Apple sauce")]));
        database.expect_get_nutrition_detail().times(1).returning(|c| {
            Ok(NutritionRecord {
                external_id: c.external_id.clone(),
                description: c.description.clone(),
                calories_per_100g: 68.0,
                nutrients: NutrientProfile::default(),
            })
        });

        let config = NutritionConfig {
            min_similarity: 1.0,
            ..Default::default()
        };
        let matcher = NutritionMatcher::new(Arc::new(database), embedder(), &config);
        let matched = matcher.match_food("apple").await.unwrap().unwrap();
        assert_eq!(matched.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_empty_label_skips_search() {
        let mut database = MockNutritionDatabase::new();
        database.expect_search_candidates().never();
        assert!(matcher(database).match_food("123 !!").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let mut database = MockNutritionDatabase::new();
        database
            .expect_search_candidates()
            .returning(|_, _| Err(NutritionError::RateLimit));
        assert!(matcher(database).match_food("apple").await.is_err());
    }

    #[tokio::test]
    async fn test_ties_keep_first_candidate() {
        let database = MockNutritionDatabase::new();
        let matcher = matcher(database);
        let candidates = vec![candidate("a", "Apples, raw"), candidate("b", "Apple, fuji")];
        let (best, _) = matcher.best_candidate("apple", &candidates).await.unwrap().unwrap();
        assert_eq!(best.external_id, "a");
    }
}
