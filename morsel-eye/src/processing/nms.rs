//! Non-maximum suppression over raw detections

use morsel_core::RawDetection;
use std::cmp::Ordering;

/// Collapse overlapping detections of the same physical object.
///
/// Detections are visited in descending confidence order; every later
/// detection whose IoU with a kept one exceeds `iou_threshold` is dropped.
/// Detections with a non-finite confidence are discarded up front.
pub fn apply_nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    if detections.is_empty() {
        return detections;
    }

    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        for j in (i + 1)..detections.len() {
            if suppressed[j] {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    detections
        .into_iter()
        .zip(suppressed)
        .filter_map(|(det, dropped)| (!dropped).then_some(det))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use morsel_core::{BoundingBox, DetectionSource};
    use proptest::prelude::*;

    fn det(label: &str, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> RawDetection {
        RawDetection::new(label, confidence, BoundingBox::new(x, y, w, h), DetectionSource::Local)
    }

    #[test]
    fn test_nms_empty() {
        assert!(apply_nms(Vec::new(), 0.4).is_empty());
    }

    #[test]
    fn test_nms_suppresses_high_overlap() {
        // IoU = 90*100 / (100*100*2 - 9000) ≈ 0.82
        let out = apply_nms(
            vec![
                det("Apple", 0.6, 10.0, 0.0, 100.0, 100.0),
                det("Apple", 0.9, 0.0, 0.0, 100.0, 100.0),
            ],
            0.4,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_low_overlap() {
        // IoU = 50*100 / (20000 - 5000) ≈ 0.33
        let out = apply_nms(
            vec![
                det("Apple", 0.9, 0.0, 0.0, 100.0, 100.0),
                det("Orange", 0.8, 50.0, 0.0, 100.0, 100.0),
            ],
            0.4,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_nms_threshold_is_exclusive() {
        // Intersection 50, union 150: IoU exactly 1/3
        let out = apply_nms(
            vec![
                det("a", 0.9, 0.0, 0.0, 10.0, 10.0),
                det("b", 0.8, 5.0, 0.0, 10.0, 10.0),
            ],
            1.0 / 3.0,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_nms_suppressed_box_does_not_suppress() {
        // b is suppressed by a, c is disjoint from a
        let out = apply_nms(
            vec![
                det("a", 0.9, 0.0, 0.0, 100.0, 100.0),
                det("b", 0.8, 30.0, 0.0, 100.0, 100.0),
                det("c", 0.7, 110.0, 0.0, 100.0, 100.0),
            ],
            0.4,
        );
        let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn test_nms_drops_nan_confidence() {
        let out = apply_nms(vec![det("a", f32::NAN, 0.0, 0.0, 10.0, 10.0)], 0.4);
        assert!(out.is_empty());
    }

    proptest! {
        #[test]
        fn prop_nms_output_sorted_and_pairwise_separated(
            boxes in proptest::collection::vec(
                (0.0f32..1.0, 0.0f32..500.0, 0.0f32..500.0, 1.0f32..200.0, 1.0f32..200.0),
                0..20,
            )
        ) {
            let input: Vec<_> = boxes
                .iter()
                .map(|(c, x, y, w, h)| det("x", *c, *x, *y, *w, *h))
                .collect();
            let out = apply_nms(input, 0.4);
            for pair in out.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
            for i in 0..out.len() {
                for j in (i + 1)..out.len() {
                    prop_assert!(out[i].bbox.iou(&out[j].bbox) <= 0.4);
                }
            }
        }
    }
}
