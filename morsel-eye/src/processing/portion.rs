//! Portion weight estimation from a single 2-D bounding box

use crate::error::{Result, VisionError};
use morsel_core::tables::{default_portion_for, density_for, max_weight_for, FALLBACK_PORTION};
use morsel_core::{BoundingBox, CalibrationResult, EstimationMethod, PortionConfig, PortionEstimate};
use std::f32::consts::PI;
use tracing::{debug, warn};

/// Volume in cm³ of a food of the given real-world box, using the first
/// shape heuristic whose keyword appears in the label.
pub fn estimate_volume(label: &str, width_cm: f32, height_cm: f32) -> f32 {
    let lower = label.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));
    let min_side = width_cm.min(height_cm);
    let sphere = |radius: f32| 4.0 / 3.0 * PI * radius.powi(3);

    if has(&["apple", "orange"]) {
        sphere((width_cm + height_cm) / 2.0 / 2.0)
    } else if has(&["banana"]) {
        let radius = min_side / 2.0;
        PI * radius.powi(2) * width_cm.max(height_cm)
    } else if has(&["egg"]) {
        let a = width_cm / 2.0;
        let b = height_cm / 2.0;
        let c = a.min(b);
        4.0 / 3.0 * PI * a * b * c
    } else if has(&["grape", "berry"]) {
        sphere(min_side / 2.0)
    } else if has(&["bread", "slice"]) {
        width_cm * height_cm * (0.3 * min_side)
    } else {
        width_cm * height_cm * (0.5 * min_side)
    }
}

/// Turns a food box plus optional scale into a weight estimate.
#[derive(Debug, Clone, Default)]
pub struct PortionEstimator {
    config: PortionConfig,
}

impl PortionEstimator {
    pub fn new(config: PortionConfig) -> Self {
        Self { config }
    }

    /// Upper weight bound for a label; configured overrides win.
    pub fn max_weight(&self, label: &str) -> f32 {
        let lower = label.to_lowercase();
        self.config
            .max_weight_overrides
            .iter()
            .find(|(key, _)| lower.contains(&key.to_lowercase()))
            .map(|(_, grams)| *grams)
            .unwrap_or_else(|| max_weight_for(label))
    }

    /// Estimate the weight of one food.
    ///
    /// `image_area` is the real image area in px² when known; the configured
    /// assumed area is used otherwise.
    pub fn estimate(
        &self,
        bbox: &BoundingBox,
        label: &str,
        detector_confidence: f32,
        calibration: Option<&CalibrationResult>,
        image_area: Option<f32>,
    ) -> Result<PortionEstimate> {
        if !bbox.is_valid() {
            return Err(VisionError::Geometry(format!(
                "'{}' has a degenerate box {:?}",
                label, bbox
            )));
        }

        match calibration {
            Some(cal) => Ok(self.estimate_with_scale(bbox, label, detector_confidence, cal)),
            None => Ok(self.estimate_without_scale(bbox, label, detector_confidence, image_area)),
        }
    }

    fn estimate_with_scale(
        &self,
        bbox: &BoundingBox,
        label: &str,
        detector_confidence: f32,
        calibration: &CalibrationResult,
    ) -> PortionEstimate {
        let mut width_cm = bbox.width / calibration.pixels_per_cm;
        let mut height_cm = bbox.height / calibration.pixels_per_cm;

        if width_cm > self.config.max_dimension_cm || height_cm > self.config.max_dimension_cm {
            warn!(
                "'{}' measures {:.1}x{:.1} cm, halving dimensions",
                label, width_cm, height_cm
            );
            width_cm /= 2.0;
            height_cm /= 2.0;
        }

        let area_cm2 = width_cm * height_cm;
        let volume_cm3 = estimate_volume(label, width_cm, height_cm);
        let density = density_for(label);
        let grams = self.finalize_grams(label, volume_cm3 * density);

        debug!(
            "'{}': {:.1}x{:.1} cm, {:.1} cm³ at {} g/cm³ → {} g",
            label, width_cm, height_cm, volume_cm3, density, grams
        );

        PortionEstimate {
            grams,
            method: EstimationMethod::ReferenceObject,
            confidence: detector_confidence.min(calibration.confidence),
            reference_object_used: Some(calibration.reference_name.clone()),
            area_cm2: Some(area_cm2),
            volume_cm3: Some(volume_cm3),
        }
    }

    fn estimate_without_scale(
        &self,
        bbox: &BoundingBox,
        label: &str,
        detector_confidence: f32,
        image_area: Option<f32>,
    ) -> PortionEstimate {
        let confidence = detector_confidence * self.config.no_reference_confidence_factor;

        let (weight, method) = match default_portion_for(label) {
            Some(base) => {
                let image_area = image_area
                    .filter(|a| a.is_finite() && *a > 0.0)
                    .unwrap_or(self.config.assumed_image_area);
                let relative_area = (bbox.area() / image_area).min(1.0);
                (base * relative_area.sqrt(), EstimationMethod::DefaultScaling)
            }
            None => (FALLBACK_PORTION, EstimationMethod::Default),
        };

        let grams = self.finalize_grams(label, weight);
        debug!("'{}': no scale, {} g ({})", label, grams, method);

        PortionEstimate {
            grams,
            method,
            confidence,
            reference_object_used: None,
            area_cm2: None,
            volume_cm3: None,
        }
    }

    /// Clamp to the plausible maximum and round to whole grams, never below 1 g.
    fn finalize_grams(&self, label: &str, weight: f32) -> f32 {
        let max = self.max_weight(label);
        let weight = if weight.is_finite() { weight } else { max };
        if weight > max {
            warn!("'{}' estimate {:.0} g clamped to {} g", label, weight, max);
        }
        weight.min(max).round().max(1.0).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(pixels_per_cm: f32) -> CalibrationResult {
        CalibrationResult {
            reference_name: "coin".to_string(),
            pixels_per_cm,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_volume_shapes() {
        let sphere = estimate_volume("apple", 8.0, 8.0);
        assert!((sphere - 4.0 / 3.0 * PI * 64.0).abs() < 1e-3);

        let cylinder = estimate_volume("banana", 4.0, 18.0);
        assert!((cylinder - PI * 4.0 * 18.0).abs() < 1e-3);

        let ellipsoid = estimate_volume("egg", 4.0, 6.0);
        assert!((ellipsoid - 4.0 / 3.0 * PI * 2.0 * 3.0 * 2.0).abs() < 1e-3);

        let grape = estimate_volume("red grape", 2.0, 3.0);
        assert!((grape - 4.0 / 3.0 * PI).abs() < 1e-4);

        assert!((estimate_volume("bread", 10.0, 10.0) - 300.0).abs() < 1e-3);
        assert!((estimate_volume("salad", 10.0, 10.0) - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_volume_priority_order() {
        // "pineapple" hits the sphere rule before anything else
        assert_eq!(estimate_volume("pineapple", 8.0, 8.0), estimate_volume("apple", 8.0, 8.0));
        // "eggplant slice" is an egg before it is a slice
        assert_eq!(estimate_volume("eggplant slice", 4.0, 6.0), estimate_volume("egg", 4.0, 6.0));
    }

    #[test]
    fn test_reference_estimate_apple() {
        // 160 px at 20 px/cm = 8 cm sphere: 268 cm³ * 0.8 = 214 g
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 160.0, 160.0);
        let est = estimator
            .estimate(&bbox, "apple", 0.8, Some(&calibration(20.0)), None)
            .unwrap();
        assert_eq!(est.method, EstimationMethod::ReferenceObject);
        assert_eq!(est.grams, 214.0);
        assert_eq!(est.confidence, 0.8);
        assert_eq!(est.reference_object_used.as_deref(), Some("coin"));
        assert!((est.area_cm2.unwrap() - 64.0).abs() < 1e-3);
    }

    #[test]
    fn test_confidence_is_min_of_food_and_reference() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let est = estimator
            .estimate(&bbox, "rice", 0.95, Some(&calibration(20.0)), None)
            .unwrap();
        assert_eq!(est.confidence, 0.9);
    }

    #[test]
    fn test_max_weight_clamp() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 800.0, 800.0);
        for (label, max) in [("grape", 10.0), ("egg", 80.0), ("apple", 300.0), ("stew", 500.0)] {
            let est = estimator
                .estimate(&bbox, label, 0.9, Some(&calibration(20.0)), None)
                .unwrap();
            assert_eq!(est.grams, max, "label {}", label);
        }
    }

    #[test]
    fn test_max_weight_override() {
        let mut config = PortionConfig::default();
        config.max_weight_overrides.insert("Apple".to_string(), 120.0);
        let estimator = PortionEstimator::new(config);
        assert_eq!(estimator.max_weight("green apple"), 120.0);
        assert_eq!(estimator.max_weight("banana"), 200.0);
    }

    #[test]
    fn test_oversize_dimensions_are_halved() {
        // 60 cm x 20 cm at 5 px/cm exceeds 50 cm and becomes 30 x 10
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 300.0, 100.0);
        let est = estimator
            .estimate(&bbox, "cake", 0.9, Some(&calibration(5.0)), None)
            .unwrap();
        assert!((est.area_cm2.unwrap() - 300.0).abs() < 1e-3);
        // 30 * 10 * 5 = 1500 cm³ at 0.5 g/cm³ = 750 g, clamped to 500
        assert_eq!(est.grams, 500.0);
    }

    #[test]
    fn test_default_scaling_without_reference() {
        // 500x500 in a 1000x1000 image: 120 g * sqrt(0.25) = 60 g
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 500.0, 500.0);
        let est = estimator.estimate(&bbox, "banana", 0.7, None, None).unwrap();
        assert_eq!(est.method, EstimationMethod::DefaultScaling);
        assert_eq!(est.grams, 60.0);
        assert!((est.confidence - 0.42).abs() < 1e-6);
        assert!(est.reference_object_used.is_none());
        assert!(est.volume_cm3.is_none());
    }

    #[test]
    fn test_default_scaling_uses_real_image_area() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 500.0, 500.0);
        let est = estimator
            .estimate(&bbox, "banana", 0.7, None, Some(250_000.0))
            .unwrap();
        assert_eq!(est.grams, 120.0);
    }

    #[test]
    fn test_relative_area_capped() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 5000.0, 5000.0);
        let est = estimator.estimate(&bbox, "orange", 0.7, None, None).unwrap();
        assert_eq!(est.grams, 180.0);
    }

    #[test]
    fn test_default_method_without_portion_entry() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let est = estimator.estimate(&bbox, "salad", 0.5, None, None).unwrap();
        assert_eq!(est.method, EstimationMethod::Default);
        assert_eq!(est.grams, 100.0);
        assert!((est.confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_tiny_box_floors_to_one_gram() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let est = estimator.estimate(&bbox, "apple", 0.9, None, None).unwrap();
        assert_eq!(est.grams, 1.0);
    }

    #[test]
    fn test_degenerate_box_rejected() {
        let estimator = PortionEstimator::default();
        let bbox = BoundingBox::new(0.0, 0.0, 0.0, 50.0);
        let err = estimator.estimate(&bbox, "apple", 0.9, None, None).unwrap_err();
        assert!(matches!(err, VisionError::Geometry(_)));
    }
}
