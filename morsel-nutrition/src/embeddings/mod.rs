//! Text embedding providers

pub mod minilm;
pub mod remote;

use crate::error::{NutritionError, Result};
use async_trait::async_trait;
use morsel_core::{EmbeddingConfig, EmbeddingProviderKind};
use std::sync::Arc;

pub use minilm::MiniLmEmbedder;
pub use remote::RemoteEmbedder;

/// Maps text to a fixed-length vector. Deterministic for a given model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Local => {
            let (Some(model), Some(tokenizer)) = (&config.model_path, &config.tokenizer_path) else {
                return Err(NutritionError::Model(
                    "local embeddings need embedding.model_path and embedding.tokenizer_path".to_string(),
                ));
            };
            Ok(Arc::new(MiniLmEmbedder::load(model, tokenizer)?))
        }
        EmbeddingProviderKind::Remote => Ok(Arc::new(RemoteEmbedder::from_config(config)?)),
    }
}

/// Cosine similarity of two vectors; 0 when either has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(NutritionError::Embedding(format!(
            "Vector dimensions must match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// Scale a vector to unit length in place.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}
