//! morsel-nutrition: resolves detector labels to nutrition records
//!
//! A cheap candidate search against FoodData Central is followed by an
//! embedding-based pick of the closest description and one detail fetch
//! for the winner only.

pub mod cache;
pub mod embeddings;
pub mod energy;
pub mod error;
pub mod matcher;
pub mod ranking;
pub mod usda;

pub use cache::{CachedEmbedder, EmbeddingCache};
pub use embeddings::{build_embedder, cosine_similarity, EmbeddingProvider, MiniLmEmbedder, RemoteEmbedder};
pub use error::{NutritionError, Result};
pub use matcher::{NutritionMatch, NutritionMatcher};
pub use usda::{NutritionDatabase, UsdaClient};
