//! Persistence boundary for finished analyses

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use morsel_core::{Error, FoodDetection, Result};

/// Accepts completed analyses. Failures are reported as
/// `Error::PersistenceFailed` and never invalidate the analysis itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// Store the aggregate and return its id.
    async fn save(&self, detection: &FoodDetection) -> Result<String>;
}

/// Process-local store keyed by generated UUIDs.
#[derive(Default)]
pub struct InMemoryDetectionStore {
    detections: DashMap<String, FoodDetection>,
}

impl InMemoryDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<FoodDetection> {
        self.detections.get(id).map(|d| d.value().clone())
    }

    /// Analyses containing an item whose name includes `name`, case-insensitively, newest first.
    pub fn search_by_food_name(&self, name: &str) -> Vec<FoodDetection> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.collect_newest_first(|d| {
            d.items
                .iter()
                .any(|item| item.name.to_lowercase().contains(&needle))
        })
    }

    /// Analyses created within the last `days` days, newest first.
    pub fn recent(&self, days: u32) -> Vec<FoodDetection> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        self.collect_newest_first(|d| d.created_at >= cutoff)
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    fn collect_newest_first(&self, predicate: impl Fn(&FoodDetection) -> bool) -> Vec<FoodDetection> {
        let mut found: Vec<FoodDetection> = self
            .detections
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[async_trait]
impl DetectionStore for InMemoryDetectionStore {
    async fn save(&self, detection: &FoodDetection) -> Result<String> {
        if detection.filename.len() > 1024 {
            return Err(Error::PersistenceFailed("filename too long (max 1024 chars)".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut stored = detection.clone();
        stored.id = Some(id.clone());
        self.detections.insert(id.clone(), stored);
        Ok(id)
    }
}
