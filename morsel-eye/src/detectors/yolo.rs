//! Local single-shot food detector running an ONNX model

use crate::detector::ObjectDetector;
use crate::error::{Result, VisionError};
use crate::models::classes::{display_label, load_class_names};
use crate::processing::nms::apply_nms;
use crate::processing::preprocess::{decode_image, to_input_tensor};
use async_trait::async_trait;
use morsel_core::{BoundingBox, DetectionConfig, DetectionSource, RawDetection};
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Geometry and filtering needed to turn raw model output into detections.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub input_size: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub confidence_threshold: f32,
}

/// Decode a `[1, 4 + classes, anchors]` output tensor.
///
/// Each anchor holds `(cx, cy, w, h)` in model-input pixels followed by one
/// score per class; the best class score is the confidence. Boxes are
/// rescaled to the original image, clamped to its bounds, and dropped when
/// nothing is left of them.
pub fn decode_output(
    data: &[f32],
    dims: &[i64],
    class_names: &[String],
    params: DecodeParams,
) -> Result<Vec<RawDetection>> {
    if dims.len() != 3 {
        return Err(VisionError::Processing(format!(
            "Expected 3D output tensor, got {}D",
            dims.len()
        )));
    }

    let num_features = dims[1].max(0) as usize;
    let num_anchors = dims[2].max(0) as usize;
    if num_features <= 4 {
        return Err(VisionError::Processing(format!(
            "Output has {} features, expected box coordinates plus class scores",
            num_features
        )));
    }
    if data.len() < num_features * num_anchors {
        return Err(VisionError::Processing(format!(
            "Output holds {} values, shape {:?} needs {}",
            data.len(),
            dims,
            num_features * num_anchors
        )));
    }

    let num_classes = (num_features - 4).min(class_names.len());
    let scale_x = params.original_width as f32 / params.input_size as f32;
    let scale_y = params.original_height as f32 / params.input_size as f32;
    let (img_w, img_h) = (params.original_width as f32, params.original_height as f32);

    let mut detections = Vec::new();
    for anchor in 0..num_anchors {
        let feature = |f: usize| data[f * num_anchors + anchor];

        let best = (0..num_classes)
            .map(|c| (c, feature(4 + c)))
            .fold(None, |best: Option<(usize, f32)>, (c, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((c, score)),
            });

        let Some((class_id, confidence)) = best else { continue };
        if !confidence.is_finite() || confidence < params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            feature(0) * scale_x,
            feature(1) * scale_y,
            feature(2) * scale_x,
            feature(3) * scale_y,
        )
        .clamp_to(img_w, img_h);

        if !bbox.is_valid() {
            continue;
        }

        detections.push(RawDetection::new(
            display_label(&class_names[class_id]),
            confidence,
            bbox,
            DetectionSource::Local,
        ));
    }

    Ok(detections)
}

/// YOLO-style detector backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent calls serialize on
/// the session lock inside the blocking pool.
pub struct YoloDetector {
    session: Arc<Mutex<Session>>,
    class_names: Arc<Vec<String>>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn load(config: &DetectionConfig) -> Result<Self> {
        let class_names = load_class_names(config.labels_path.as_deref())?;
        Self::from_file(
            config.model_path(),
            class_names,
            config.input_size,
            config.local_confidence_threshold,
            config.nms_iou_threshold,
        )
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        class_names: Vec<String>,
        input_size: u32,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VisionError::Model(format!("Model file not found: {:?}", path)));
        }

        info!("Loading detector model from {:?}", path);
        let session = Session::builder()?.commit_from_file(path)?;
        info!("Detector model loaded ({} classes)", class_names.len());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            class_names: Arc::new(class_names),
            input_size,
            confidence_threshold,
            iou_threshold,
        })
    }

    fn infer(
        session: &Mutex<Session>,
        class_names: &[String],
        image: &[u8],
        width: u32,
        height: u32,
        input_size: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        let rgb = decode_image(image)?.to_rgb8();
        let (original_width, original_height) = if width > 0 && height > 0 {
            (width, height)
        } else {
            rgb.dimensions()
        };

        let input = to_input_tensor(&rgb, input_size);
        let tensor = TensorRef::from_array_view(input.view())?;

        let mut session = session.lock();
        let outputs = session.run(ort::inputs![tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        debug!("Detector output shape: {:?}", shape);

        decode_output(
            data,
            shape.as_ref(),
            class_names,
            DecodeParams {
                input_size,
                original_width,
                original_height,
                confidence_threshold,
            },
        )
    }
}

#[async_trait]
impl ObjectDetector for YoloDetector {
    fn name(&self) -> &'static str {
        "local-yolo"
    }

    async fn detect(&self, image: &[u8], width: u32, height: u32) -> morsel_core::Result<Vec<RawDetection>> {
        let session = Arc::clone(&self.session);
        let class_names = Arc::clone(&self.class_names);
        let image = image.to_vec();
        let input_size = self.input_size;
        let confidence_threshold = self.confidence_threshold;

        let raw = tokio::task::spawn_blocking(move || {
            Self::infer(
                &session,
                &class_names,
                &image,
                width,
                height,
                input_size,
                confidence_threshold,
            )
        })
        .await
        .map_err(|e| VisionError::Processing(format!("Inference task failed: {}", e)))??;

        let before = raw.len();
        let detections = apply_nms(raw, self.iou_threshold);
        info!("Local detector: {} detections ({} before NMS)", detections.len(), before);
        Ok(detections)
    }
}
