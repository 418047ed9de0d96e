use morsel_core::tables::max_weight_for;
use morsel_core::{
    BoundingBox, CalibrationConfig, CalibrationResult, DetectedFoodItem, DetectionSource, EstimationMethod,
    FoodCategory, NutrientProfile, PortionConfig, RawDetection,
};
use morsel_eye::{apply_nms, partition_references, PortionEstimator, ScaleCalibrator};
use morsel_pipeline::finalize;
use proptest::prelude::*;
use std::collections::HashSet;

fn bbox_strategy() -> impl Strategy<Value = BoundingBox> {
    (0.0f32..1000.0, 0.0f32..1000.0, 1.0f32..600.0, 1.0f32..600.0)
        .prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
}

fn detection_strategy() -> impl Strategy<Value = RawDetection> {
    (prop::sample::select(vec!["Apple", "Banana", "Bread"]), 0.0f32..1.0, bbox_strategy())
        .prop_map(|(label, confidence, bbox)| RawDetection::new(label, confidence, bbox, DetectionSource::Local))
}

fn item(name: &str, confidence: f32) -> DetectedFoodItem {
    DetectedFoodItem {
        name: name.to_string(),
        category: FoodCategory::Other,
        confidence,
        portion_confidence: confidence,
        estimated_grams: 100.0,
        estimated_calories: 50.0,
        estimation_method: EstimationMethod::Default,
        reference_object: None,
        bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        nutrition_source_id: "1".to_string(),
        nutrients: NutrientProfile::default(),
    }
}

proptest! {
    #[test]
    fn test_nms_survivors_do_not_overlap(
        detections in prop::collection::vec(detection_strategy(), 0..40),
        threshold in 0.1f32..0.9,
    ) {
        let input_len = detections.len();
        let kept = apply_nms(detections, threshold);

        prop_assert!(kept.len() <= input_len);
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                prop_assert!(a.bbox.iou(&b.bbox) <= threshold);
            }
        }
        prop_assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_calibration_stays_in_bounds(size in 0.5f32..4000.0, confidence in 0.0f32..1.0) {
        let coin = RawDetection::new("Coin", confidence, BoundingBox::new(0.0, 0.0, size, size), DetectionSource::Cloud);
        let (references, foods) = partition_references(vec![coin]);
        prop_assert!(foods.is_empty());

        let config = CalibrationConfig::default();
        let calibration = ScaleCalibrator::new(&config).calibrate(&references).unwrap();
        prop_assert!(calibration.pixels_per_cm >= config.min_pixels_per_cm);
        prop_assert!(calibration.pixels_per_cm <= config.max_pixels_per_cm);
    }

    #[test]
    fn test_portion_within_plausible_range(
        bbox in bbox_strategy(),
        label in prop::sample::select(vec!["apple", "banana", "bread", "egg", "rice", "mystery stew"]),
        pixels_per_cm in prop::option::of(5.0f32..100.0),
    ) {
        let calibration = pixels_per_cm.map(|pixels_per_cm| CalibrationResult {
            reference_name: "coin".to_string(),
            pixels_per_cm,
            confidence: 0.9,
        });
        let estimate = PortionEstimator::new(PortionConfig::default())
            .estimate(&bbox, label, 0.8, calibration.as_ref(), Some(1_000_000.0))
            .unwrap();

        prop_assert!(estimate.grams >= 1.0);
        prop_assert!(estimate.grams <= max_weight_for(label));
        prop_assert_eq!(estimate.grams, estimate.grams.round());
        prop_assert!(estimate.confidence <= 0.8);
    }

    #[test]
    fn test_finalize_has_unique_sorted_names(
        entries in prop::collection::vec(
            (prop::sample::select(vec!["Apple", "apple", "Banana", " banana ", "Rice"]), 0.0f32..1.0),
            0..30,
        ),
    ) {
        let items: Vec<_> = entries.iter().map(|(name, c)| item(name, *c)).collect();
        let out = finalize(items);

        let names: HashSet<String> = out.iter().map(|i| i.name.trim().to_lowercase()).collect();
        prop_assert_eq!(names.len(), out.len());
        prop_assert!(out.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        for kept in &out {
            let key = kept.name.trim().to_lowercase();
            let best = entries
                .iter()
                .filter(|(name, _)| name.trim().to_lowercase() == key)
                .map(|(_, c)| *c)
                .fold(f32::MIN, f32::max);
            prop_assert_eq!(kept.confidence, best);
        }
    }
}
