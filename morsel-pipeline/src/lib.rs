//! morsel-pipeline: turns one food photo into a deduplicated, sorted list
//! of portion and calorie estimates, and hands finished analyses to a store.

pub mod analyzer;
pub mod dedupe;
pub mod store;

pub use analyzer::{calories_for, FoodAnalyzer};
pub use dedupe::{dedupe_by_name, finalize, sort_by_confidence};
pub use store::{DetectionStore, InMemoryDetectionStore};
