//! Food analysis orchestration

use crate::dedupe::finalize;
use crate::store::DetectionStore;
use futures::stream::{self, StreamExt};
use morsel_core::labels::{categorize, clean_label, title_case};
use morsel_core::{
    CalibrationResult, DetectedFoodItem, DetectionConfig, Error, FoodDetection, MorselConfig, RawDetection, Result,
};
use morsel_eye::processing::preprocess::image_dimensions;
use morsel_eye::{build_detector, partition_references, ObjectDetector, PortionEstimator, ScaleCalibrator};
use morsel_nutrition::{build_embedder, CachedEmbedder, NutritionMatcher, UsdaClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A food detection that survived filtering, with its cleaned label.
#[derive(Debug, Clone)]
struct Candidate {
    detection: RawDetection,
    label: String,
}

/// Runs detect → calibrate → per-candidate match and estimate → dedupe/sort.
///
/// Candidates are processed concurrently, at most `max_concurrent_lookups`
/// at a time, each bounded by the request timeout. A failing candidate is
/// dropped; a failing detector fails the whole image. Dropping the returned
/// future cancels all in-flight lookups.
pub struct FoodAnalyzer {
    detector: Arc<dyn ObjectDetector>,
    matcher: Arc<NutritionMatcher>,
    calibrator: ScaleCalibrator,
    estimator: PortionEstimator,
    detection: DetectionConfig,
    max_concurrent_lookups: usize,
    request_timeout: Duration,
}

impl FoodAnalyzer {
    pub fn new(detector: Arc<dyn ObjectDetector>, matcher: Arc<NutritionMatcher>, config: &MorselConfig) -> Self {
        Self {
            detector,
            matcher,
            calibrator: ScaleCalibrator::new(&config.calibration),
            estimator: PortionEstimator::new(config.portion.clone()),
            detection: config.detection.clone(),
            max_concurrent_lookups: config.nutrition.max_concurrent_lookups.max(1),
            request_timeout: config.nutrition.request_timeout(),
        }
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &MorselConfig) -> Result<Self> {
        config.validate()?;
        let detector = build_detector(&config.detection)?;
        Self::with_detector(detector, config)
    }

    /// Build the nutrition side from configuration around a given detector.
    pub fn with_detector(detector: Arc<dyn ObjectDetector>, config: &MorselConfig) -> Result<Self> {
        let database = Arc::new(UsdaClient::from_config(&config.nutrition)?);
        let provider = build_embedder(&config.embedding)?;
        let embedder = Arc::new(CachedEmbedder::new(provider, config.embedding.cache_capacity));
        info!(
            "Analyzer ready: detector={}, embeddings={}",
            detector.name(),
            embedder.provider_name()
        );

        let matcher = Arc::new(NutritionMatcher::new(database, embedder, &config.nutrition));
        Ok(Self::new(detector, matcher, config))
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Analyze encoded image bytes whose pixel size is already known.
    pub async fn analyze(&self, image: &[u8], width: u32, height: u32) -> Result<Vec<DetectedFoodItem>> {
        let detections = self.detector.detect(image, width, height).await?;
        info!("{} detector returned {} objects", self.detector.name(), detections.len());

        let (references, foods) = partition_references(detections);
        let calibration = self.calibrator.calibrate(&references);
        match &calibration {
            Some(cal) => info!("Scale: {:.2} px/cm from {}", cal.pixels_per_cm, cal.reference_name),
            None => info!("No usable reference object, estimating portions without scale"),
        }

        let image_area = (width > 0 && height > 0).then(|| width as f32 * height as f32);
        let candidates = self.select_candidates(foods);
        info!("Processing {} food candidates", candidates.len());

        let results: Vec<Result<Option<DetectedFoodItem>>> = stream::iter(candidates)
            .map(|candidate| self.process_candidate(candidate, calibration.as_ref(), image_area))
            .buffered(self.max_concurrent_lookups)
            .collect()
            .await;

        let mut items = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) if e.is_candidate_scoped() => warn!("Dropping candidate: {}", e),
                Err(e) => error!("Dropping candidate after unexpected failure: {}", e),
            }
        }

        let items = finalize(items);
        info!("Analysis complete: {} food items", items.len());
        Ok(items)
    }

    /// Analyze encoded image bytes, decoding them for their pixel size.
    pub async fn analyze_bytes(&self, image: &[u8]) -> Result<Vec<DetectedFoodItem>> {
        let (width, height) = image_dimensions(image)?;
        debug!("Decoded image: {}x{}", width, height);
        self.analyze(image, width, height).await
    }

    /// Analyze and hand the aggregate to `store`. A failed save is logged and
    /// the aggregate is returned without an id.
    pub async fn analyze_and_record(
        &self,
        store: &dyn DetectionStore,
        image: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<FoodDetection> {
        let items = self.analyze_bytes(image).await?;
        let mut detection = FoodDetection::new(filename, content_type, image.len() as u64, items);

        match store.save(&detection).await {
            Ok(id) => {
                info!("Saved analysis {} ({} items)", id, detection.items.len());
                detection.id = Some(id);
            }
            Err(e) => error!("Failed to save analysis of {}: {}", filename, e),
        }
        Ok(detection)
    }

    /// Apply the per-source threshold, box validity and label cleanup.
    fn select_candidates(&self, foods: Vec<RawDetection>) -> Vec<Candidate> {
        foods
            .into_iter()
            .filter(|d| {
                let keep = d.confidence >= self.detection.threshold_for(d.source);
                if !keep {
                    debug!("'{}' below threshold ({:.2})", d.label, d.confidence);
                }
                keep
            })
            .filter(|d| {
                let valid = d.bbox.is_valid();
                if !valid {
                    warn!("Skipping '{}' with degenerate box {:?}", d.label, d.bbox);
                }
                valid
            })
            .filter_map(|detection| {
                let label = clean_label(&detection.label);
                if label.is_empty() {
                    debug!("'{}' has no usable label", detection.label);
                    None
                } else {
                    Some(Candidate { detection, label })
                }
            })
            .collect()
    }

    async fn process_candidate(
        &self,
        candidate: Candidate,
        calibration: Option<&CalibrationResult>,
        image_area: Option<f32>,
    ) -> Result<Option<DetectedFoodItem>> {
        let Candidate { detection, label } = candidate;

        let matched = tokio::time::timeout(self.request_timeout, self.matcher.match_food(&label))
            .await
            .map_err(|_| {
                Error::NutritionLookupFailed(format!(
                    "lookup for '{}' timed out after {:?}",
                    label, self.request_timeout
                ))
            })??;

        let Some(matched) = matched else {
            debug!("'{}' excluded: no nutrition match", label);
            return Ok(None);
        };

        let estimate = self
            .estimator
            .estimate(&detection.bbox, &label, detection.confidence, calibration, image_area)?;
        let record = matched.record;
        let calories = calories_for(estimate.grams, record.calories_per_100g);

        debug!(
            "'{}': {} g × {:.1} kcal/100g = {:.1} kcal ({})",
            label, estimate.grams, record.calories_per_100g, calories, estimate.method
        );

        Ok(Some(DetectedFoodItem {
            name: title_case(&label),
            category: categorize(&label),
            confidence: detection.confidence,
            portion_confidence: estimate.confidence,
            estimated_grams: estimate.grams,
            estimated_calories: calories,
            estimation_method: estimate.method,
            reference_object: estimate.reference_object_used,
            bounding_box: detection.bbox,
            nutrition_source_id: record.external_id,
            nutrients: record.nutrients.scaled_to(estimate.grams),
        }))
    }
}

/// Calories for a portion from a per-100 g energy density.
pub fn calories_for(grams: f32, calories_per_100g: f32) -> f32 {
    grams * calories_per_100g / 100.0
}
