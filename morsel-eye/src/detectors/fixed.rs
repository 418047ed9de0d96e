//! Detector returning a fixed set of detections

use crate::detector::ObjectDetector;
use crate::error::Result;
use async_trait::async_trait;
use morsel_core::RawDetection;
use std::path::Path;

/// Replays precomputed detections for every image. Used for offline runs
/// (`morsel analyze --detections`) and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<RawDetection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }

    /// Load a JSON array of detections.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let detections: Vec<RawDetection> = serde_json::from_str(&content)
            .map_err(|e| crate::error::VisionError::Config(format!("Invalid detections file: {}", e)))?;
        Ok(Self::new(detections))
    }
}

#[async_trait]
impl ObjectDetector for StaticDetector {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn detect(&self, _image: &[u8], _width: u32, _height: u32) -> morsel_core::Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morsel_core::{BoundingBox, DetectionSource};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("detections.json");
        std::fs::write(
            &path,
            r#"[{"label":"Coin","confidence":0.9,"bbox":{"x":10,"y":10,"width":24,"height":24},"source":"cloud"}]"#,
        )
        .unwrap();

        let detector = StaticDetector::from_json_file(&path).unwrap();
        let out = detector.detect(b"", 0, 0).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "Coin");
        assert_eq!(out[0].bbox, BoundingBox::new(10.0, 10.0, 24.0, 24.0));
        assert_eq!(out[0].source, DetectionSource::Cloud);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("detections.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StaticDetector::from_json_file(&path).is_err());
        assert!(StaticDetector::from_json_file(temp_dir.path().join("missing.json")).is_err());
    }
}
