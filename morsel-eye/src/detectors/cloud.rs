//! Cloud object localization detector (Google Cloud Vision REST API)

use crate::detector::ObjectDetector;
use crate::error::{Result, VisionError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use morsel_core::tables::find_reference_object;
use morsel_core::{BoundingBox, DetectionConfig, DetectionSource, RawDetection};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    localized_object_annotations: Vec<ObjectAnnotation>,
    error: Option<StatusBody>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectAnnotation {
    name: String,
    #[serde(default)]
    score: f32,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingPoly {
    #[serde(default)]
    normalized_vertices: Vec<NormalizedVertex>,
}

/// Zero coordinates are omitted from the wire format.
#[derive(Debug, Deserialize)]
struct NormalizedVertex {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

/// Pixel box enclosing normalized vertices of an image of the given size.
fn pixel_box(vertices: &[NormalizedVertex], width: u32, height: u32) -> Option<BoundingBox> {
    if vertices.len() < 2 {
        return None;
    }
    let (w, h) = (width as f32, height as f32);
    let min_x = vertices.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
    let max_x = vertices.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
    let max_y = vertices.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);

    let x1 = (min_x * w).round();
    let y1 = (min_y * h).round();
    let x2 = (max_x * w).round();
    let y2 = (max_y * h).round();
    Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
}

pub struct CloudVisionDetector {
    client: Client,
    endpoint: String,
    api_key: String,
    confidence_threshold: f32,
    max_results: u32,
}

impl CloudVisionDetector {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, confidence_threshold: f32) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            confidence_threshold,
            max_results: 50,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        let api_key = config
            .vision_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VisionError::Config("vision API key not set".to_string()))?;

        let mut detector = Self::new(&config.vision_endpoint, api_key, config.cloud_confidence_threshold);
        detector.max_results = config.max_cloud_results;
        Ok(detector)
    }

    async fn annotate(&self, image: &[u8]) -> Result<ImageResponse> {
        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": "OBJECT_LOCALIZATION", "maxResults": self.max_results }],
            }]
        });

        let key_prefix: String = self.api_key.chars().take(4).collect();
        debug!("Calling cloud vision with key {}***", key_prefix);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(VisionError::Unauthorized("cloud vision".to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(500).collect();
            return Err(VisionError::Remote(format!("HTTP {}: {}", status, text)));
        }

        let parsed: AnnotateResponse = response.json().await?;
        let image_response = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| VisionError::Remote("empty annotate response".to_string()))?;

        if let Some(err) = &image_response.error {
            return Err(VisionError::Remote(format!("code {}: {}", err.code, err.message)));
        }
        Ok(image_response)
    }
}

#[async_trait]
impl ObjectDetector for CloudVisionDetector {
    fn name(&self) -> &'static str {
        "cloud-vision"
    }

    async fn detect(&self, image: &[u8], width: u32, height: u32) -> morsel_core::Result<Vec<RawDetection>> {
        let response = self.annotate(image).await?;
        let total = response.localized_object_annotations.len();

        let detections: Vec<RawDetection> = response
            .localized_object_annotations
            .into_iter()
            .filter(|obj| obj.score >= self.confidence_threshold || find_reference_object(&obj.name).is_some())
            .filter_map(|obj| {
                let vertices = obj.bounding_poly.as_ref().map(|p| p.normalized_vertices.as_slice())?;
                let bbox = pixel_box(vertices, width, height)?;
                Some(RawDetection::new(obj.name, obj.score, bbox, DetectionSource::Cloud))
            })
            .collect();

        info!(
            "Cloud vision: kept {} of {} objects (food threshold {:.2})",
            detections.len(),
            total,
            self.confidence_threshold
        );
        Ok(detections)
    }
}
