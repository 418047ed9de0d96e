//! Cloud-first detector with a local fallback

use crate::detector::ObjectDetector;
use async_trait::async_trait;
use morsel_core::{Error, RawDetection, Result};
use std::sync::Arc;
use tracing::warn;

/// Runs `primary`; when it is unavailable, runs `fallback` instead.
///
/// Results from the two back-ends are never merged. Errors other than
/// `DetectorUnavailable` (an undecodable image, say) are returned as is.
pub struct FallbackDetector {
    primary: Arc<dyn ObjectDetector>,
    fallback: Arc<dyn ObjectDetector>,
}

impl FallbackDetector {
    pub fn new(primary: Arc<dyn ObjectDetector>, fallback: Arc<dyn ObjectDetector>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ObjectDetector for FallbackDetector {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn detect(&self, image: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        match self.primary.detect(image, width, height).await {
            Err(Error::DetectorUnavailable(reason)) => {
                warn!(
                    "{} detector unavailable ({}), falling back to {}",
                    self.primary.name(),
                    reason,
                    self.fallback.name()
                );
                self.fallback.detect(image, width, height).await
            }
            other => other,
        }
    }
}
