#![allow(dead_code)]

use async_trait::async_trait;
use morsel_core::{
    BoundingBox, DetectionSource, MorselConfig, NutrientProfile, NutritionCandidate, NutritionRecord, RawDetection,
};
use morsel_eye::StaticDetector;
use morsel_nutrition::{CachedEmbedder, EmbeddingProvider, NutritionDatabase, NutritionError, NutritionMatcher};
use morsel_pipeline::FoodAnalyzer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Entry {
    pub id: &'static str,
    pub description: &'static str,
    pub calories_per_100g: f32,
}

/// In-memory food table answering substring queries.
pub struct TableDatabase {
    entries: Vec<Entry>,
    pub detail_calls: AtomicUsize,
}

impl TableDatabase {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Entry { id: "171688", description: "Apples, raw, with skin", calories_per_100g: 52.0 },
            Entry { id: "173944", description: "Bananas, raw", calories_per_100g: 89.0 },
            Entry { id: "169097", description: "Oranges, raw, navels", calories_per_100g: 49.0 },
            Entry { id: "900001", description: "Napkin-shaped apple tart", calories_per_100g: 310.0 },
        ])
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NutritionDatabase for TableDatabase {
    async fn search_candidates(&self, query: &str, max: usize) -> morsel_nutrition::Result<Vec<NutritionCandidate>> {
        let query = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|e| e.description.to_lowercase().contains(&query))
            .take(max)
            .map(|e| NutritionCandidate {
                external_id: e.id.to_string(),
                description: e.description.to_string(),
                data_type: "Foundation".to_string(),
            })
            .collect())
    }

    async fn get_nutrition_detail(&self, candidate: &NutritionCandidate) -> morsel_nutrition::Result<NutritionRecord> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == candidate.external_id)
            .ok_or_else(|| NutritionError::NotFound(candidate.external_id.clone()))?;

        Ok(NutritionRecord {
            external_id: entry.id.to_string(),
            description: entry.description.to_string(),
            calories_per_100g: entry.calories_per_100g,
            nutrients: NutrientProfile {
                protein_g: Some(1.0),
                carbohydrate_g: Some(10.0),
                ..Default::default()
            },
        })
    }
}

const VOCABULARY: &[&str] = &["apple", "banana", "orange"];

/// One dimension per known fruit plus a catch-all dimension.
pub struct BagOfWordsEmbedder;

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    fn name(&self) -> &'static str {
        "bag-of-words"
    }

    async fn embed(&self, text: &str) -> morsel_nutrition::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
            .collect();
        let known = vector.iter().any(|v| *v > 0.0);
        vector.push(if known { 0.0 } else { 1.0 });
        Ok(vector)
    }
}

pub fn cloud(label: &str, confidence: f32, bbox: BoundingBox) -> RawDetection {
    RawDetection::new(label, confidence, bbox, DetectionSource::Cloud)
}

pub fn analyzer_with(database: Arc<TableDatabase>, detections: Vec<RawDetection>) -> FoodAnalyzer {
    let config = MorselConfig::default();
    let embedder = Arc::new(CachedEmbedder::new(Arc::new(BagOfWordsEmbedder), 64));
    let matcher = Arc::new(NutritionMatcher::new(database, embedder, &config.nutrition));
    FoodAnalyzer::new(Arc::new(StaticDetector::new(detections)), matcher, &config)
}

pub fn analyzer(detections: Vec<RawDetection>) -> FoodAnalyzer {
    analyzer_with(Arc::new(TableDatabase::standard()), detections)
}

/// Solid-color PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}
