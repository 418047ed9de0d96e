//! Pixel-to-centimeter calibration from reference objects of known size

use morsel_core::tables::find_reference_object;
use morsel_core::{BoundingBox, CalibrationConfig, CalibrationResult, RawDetection, ReferenceObjectSpec, ShapeClass};
use tracing::{debug, info, warn};

/// A detection that matched the reference-object registry.
#[derive(Debug, Clone)]
pub struct ReferenceDetection {
    pub detection: RawDetection,
    pub spec: &'static ReferenceObjectSpec,
}

/// Split detections into registry matches and everything else, preserving
/// detector order on both sides.
pub fn partition_references(detections: Vec<RawDetection>) -> (Vec<ReferenceDetection>, Vec<RawDetection>) {
    let mut references = Vec::new();
    let mut others = Vec::with_capacity(detections.len());

    for detection in detections {
        match find_reference_object(&detection.label) {
            Some(spec) => references.push(ReferenceDetection { detection, spec }),
            None => others.push(detection),
        }
    }

    (references, others)
}

/// Representative pixel length of a reference object's box.
pub fn representative_pixel_size(bbox: &BoundingBox, shape: ShapeClass) -> f32 {
    match shape {
        ShapeClass::Elongated | ShapeClass::Circular => bbox.width.max(bbox.height),
        ShapeClass::Planar => (bbox.width + bbox.height) / 2.0,
    }
}

#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    min_pixels_per_cm: f32,
    max_pixels_per_cm: f32,
}

impl Default for ScaleCalibrator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

impl ScaleCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            min_pixels_per_cm: config.min_pixels_per_cm,
            max_pixels_per_cm: config.max_pixels_per_cm,
        }
    }

    /// Calibrate from the first usable reference in detector order.
    ///
    /// References with degenerate boxes are skipped. Returns `None` when no
    /// reference is usable.
    pub fn calibrate(&self, references: &[ReferenceDetection]) -> Option<CalibrationResult> {
        references.iter().find_map(|r| self.calibrate_from(r))
    }

    pub fn calibrate_from(&self, reference: &ReferenceDetection) -> Option<CalibrationResult> {
        let bbox = &reference.detection.bbox;
        if !bbox.is_valid() {
            warn!(
                "Skipping reference '{}' with degenerate box {:?}",
                reference.detection.label, bbox
            );
            return None;
        }

        let pixel_size = representative_pixel_size(bbox, reference.spec.shape);
        let raw_scale = pixel_size / reference.spec.real_size_cm;
        let pixels_per_cm = raw_scale.clamp(self.min_pixels_per_cm, self.max_pixels_per_cm);

        if pixels_per_cm != raw_scale {
            warn!(
                "Scale from '{}' clamped from {:.2} to {:.2} px/cm",
                reference.spec.name, raw_scale, pixels_per_cm
            );
        } else {
            debug!("Scale from '{}': {:.2} px/cm", reference.spec.name, pixels_per_cm);
        }

        info!(
            "Calibrated with {} ({} cm, {:.1} px)",
            reference.spec.name, reference.spec.real_size_cm, pixel_size
        );

        Some(CalibrationResult {
            reference_name: reference.spec.name.to_string(),
            pixels_per_cm,
            confidence: reference.detection.confidence,
        })
    }
}
