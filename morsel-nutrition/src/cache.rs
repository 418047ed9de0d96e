use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

const MAX_KEY_LEN: usize = 10_000;

/// Bounded text → embedding cache.
///
/// Entries are never stale since embeddings are deterministic; two tasks
/// racing on the same text both compute it and the last write wins.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Arc<[f32]>>>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, text: &str) -> Option<Arc<[f32]>> {
        self.cache.lock().get(text).cloned()
    }

    pub fn insert(&self, text: &str, embedding: Arc<[f32]>) {
        if text.len() > MAX_KEY_LEN {
            tracing::warn!("Embedding cache key too long, skipping");
            return;
        }
        self.cache.lock().put(text.to_string(), embedding);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

/// An embedding provider fronted by an [`EmbeddingCache`].
pub struct CachedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            provider,
            cache: EmbeddingCache::new(capacity),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Arc<[f32]>> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit);
        }
        // The lock is not held across the provider call.
        let embedding: Arc<[f32]> = self.provider.embed(text).await?.into();
        self.cache.insert(text, Arc::clone(&embedding));
        Ok(embedding)
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}
