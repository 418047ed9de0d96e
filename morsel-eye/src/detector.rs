//! Object detector abstraction and construction from configuration

use crate::detectors::{CloudVisionDetector, FallbackDetector, YoloDetector};
use crate::error::VisionError;
use async_trait::async_trait;
use morsel_core::{DetectionConfig, DetectorMode, RawDetection, Result};
use std::sync::Arc;
use tracing::info;

/// Produces labeled boxes from encoded image bytes.
///
/// `width` and `height` are the original image dimensions in pixels and
/// define the coordinate space of the returned boxes. Any runtime failure
/// is reported as `Error::DetectorUnavailable` and fails the whole image.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn detect(&self, image: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>>;
}

/// Build the detector selected by `config.mode`.
///
/// `Auto` needs at least one usable back-end: a vision API key for the
/// cloud detector, a model file for the local one. With both available the
/// cloud detector runs first and the local one only replaces it on failure.
pub fn build_detector(config: &DetectionConfig) -> Result<Arc<dyn ObjectDetector>> {
    match config.mode {
        DetectorMode::Cloud => Ok(Arc::new(CloudVisionDetector::from_config(config)?)),
        DetectorMode::Local => Ok(Arc::new(YoloDetector::load(config)?)),
        DetectorMode::Auto => {
            let cloud = config
                .vision_api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
                .then(|| CloudVisionDetector::from_config(config))
                .transpose()?;
            let local = if config.model_path().exists() {
                Some(YoloDetector::load(config)?)
            } else {
                None
            };

            match (cloud, local) {
                (Some(cloud), Some(local)) => {
                    info!("Detector: cloud with local fallback");
                    Ok(Arc::new(FallbackDetector::new(Arc::new(cloud), Arc::new(local))))
                }
                (Some(cloud), None) => {
                    info!("Detector: cloud only (no local model at {:?})", config.model_path());
                    Ok(Arc::new(cloud))
                }
                (None, Some(local)) => {
                    info!("Detector: local only (no vision API key)");
                    Ok(Arc::new(local))
                }
                (None, None) => Err(VisionError::Config(
                    "auto detector mode needs a vision API key or a local model file".to_string(),
                )
                .into()),
            }
        }
    }
}
