//! Local sentence embeddings (all-MiniLM-L6-v2 exported to ONNX)

use super::{l2_normalize, EmbeddingProvider};
use crate::error::{NutritionError, Result};
use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Attention-masked mean over the sequence axis of a `[1, seq, dim]` hidden state.
pub fn mean_pool(hidden: &[f32], hidden_dim: usize, attention_mask: &[u32]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut mask_sum = 0.0f32;

    for (i, &mask) in attention_mask.iter().enumerate() {
        let weight = mask as f32;
        if weight == 0.0 {
            continue;
        }
        let Some(row) = hidden.get(i * hidden_dim..(i + 1) * hidden_dim) else { break };
        mask_sum += weight;
        for (p, h) in pooled.iter_mut().zip(row) {
            *p += h * weight;
        }
    }

    if mask_sum > 0.0 {
        for p in &mut pooled {
            *p /= mask_sum;
        }
    }
    pooled
}

pub struct MiniLmEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl MiniLmEmbedder {
    pub fn load(model_path: impl AsRef<Path>, tokenizer_path: impl AsRef<Path>) -> Result<Self> {
        let (model_path, tokenizer_path) = (model_path.as_ref(), tokenizer_path.as_ref());
        if !model_path.exists() {
            return Err(NutritionError::Model(format!("Embedding model not found: {:?}", model_path)));
        }

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| NutritionError::Model(format!("Failed to load tokenizer {:?}: {}", tokenizer_path, e)))?;
        let session = Session::builder()?.commit_from_file(model_path)?;
        info!("Loaded embedding model from {:?}", model_path);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }

    fn embed_blocking(session: &Mutex<Session>, tokenizer: &Tokenizer, text: &str) -> Result<Vec<f32>> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| NutritionError::Embedding(format!("Tokenization failed: {}", e)))?;

        let attention_mask = encoding.get_attention_mask();
        let seq_len = encoding.get_ids().len();
        let shape_err = |e: ndarray::ShapeError| NutritionError::Embedding(e.to_string());

        let input_ids = Array2::from_shape_vec(
            (1, seq_len),
            encoding.get_ids().iter().map(|&t| i64::from(t)).collect(),
        )
        .map_err(shape_err)?;
        let mask = Array2::from_shape_vec(
            (1, seq_len),
            attention_mask.iter().map(|&m| i64::from(m)).collect(),
        )
        .map_err(shape_err)?;
        let token_type_ids = Array2::<i64>::zeros((1, seq_len));

        let input_ids = TensorRef::from_array_view(input_ids.view())?;
        let mask = TensorRef::from_array_view(mask.view())?;
        let token_type_ids = TensorRef::from_array_view(token_type_ids.view())?;

        let mut session = session.lock();
        let outputs = session.run(ort::inputs![input_ids, mask, token_type_ids])?;

        let (shape, hidden) = outputs[0].try_extract_tensor::<f32>()?;
        if shape.len() != 3 {
            return Err(NutritionError::Embedding(format!("Unexpected hidden state shape {:?}", shape)));
        }
        let hidden_dim = shape[2].max(0) as usize;

        let mut pooled = mean_pool(hidden, hidden_dim, attention_mask);
        l2_normalize(&mut pooled);
        debug!("Embedded '{}' ({} tokens, {} dims)", text, seq_len, hidden_dim);
        Ok(pooled)
    }
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbedder {
    fn name(&self) -> &'static str {
        "minilm"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || Self::embed_blocking(&session, &tokenizer, &text))
            .await
            .map_err(|e| NutritionError::Embedding(format!("Embedding task failed: {}", e)))?
    }
}
