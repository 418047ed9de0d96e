// Runtime configuration for the food analysis pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::types::DetectionSource;

/// Which detector back-end(s) to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// Cloud object localization only
    Cloud,
    /// Local ONNX single-shot detector only
    Local,
    /// Cloud first, local when the cloud detector is unavailable
    Auto,
}

impl std::str::FromStr for DetectorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloud" => Ok(DetectorMode::Cloud),
            "local" => Ok(DetectorMode::Local),
            "auto" => Ok(DetectorMode::Auto),
            other => Err(ConfigError::ParseError(format!("Unknown detector mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub mode: DetectorMode,
    pub cloud_confidence_threshold: f32,
    pub local_confidence_threshold: f32,
    pub nms_iou_threshold: f32,
    /// Square input side of the local model
    pub input_size: u32,
    pub model_dir: PathBuf,
    pub model_file: String,
    pub model_url: Option<String>,
    /// Hex SHA-256 of the model file, checked after download
    pub model_sha256: Option<String>,
    /// Newline-delimited class names; the built-in food classes are used when unset
    pub labels_path: Option<PathBuf>,
    pub vision_endpoint: String,
    pub vision_api_key: Option<String>,
    pub max_cloud_results: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let model_dir = dirs::home_dir()
            .map(|mut p| {
                p.push(".morsel");
                p.push("models");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models"));

        Self {
            mode: DetectorMode::Auto,
            cloud_confidence_threshold: 0.55,
            local_confidence_threshold: 0.3,
            nms_iou_threshold: 0.4,
            input_size: 640,
            model_dir,
            model_file: "yolo_food.onnx".to_string(),
            model_url: None,
            model_sha256: None,
            labels_path: None,
            vision_endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            vision_api_key: None,
            max_cloud_results: 50,
        }
    }
}

impl DetectionConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    /// Food-acceptance threshold for detections from `source`.
    pub fn threshold_for(&self, source: DetectionSource) -> f32 {
        match source {
            DetectionSource::Cloud => self.cloud_confidence_threshold,
            DetectionSource::Local => self.local_confidence_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub min_pixels_per_cm: f32,
    pub max_pixels_per_cm: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_pixels_per_cm: 5.0,
            max_pixels_per_cm: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortionConfig {
    /// Image area in px² assumed when the real dimensions are unknown
    pub assumed_image_area: f32,
    /// Food dimensions beyond this (cm) are treated as a mis-scaled reference
    pub max_dimension_cm: f32,
    pub no_reference_confidence_factor: f32,
    /// Keyword → max grams, consulted before the built-in table
    pub max_weight_overrides: BTreeMap<String, f32>,
}

impl Default for PortionConfig {
    fn default() -> Self {
        Self {
            assumed_image_area: 1_000_000.0,
            max_dimension_cm: 50.0,
            no_reference_confidence_factor: 0.6,
            max_weight_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_candidates: usize,
    pub min_similarity: f32,
    pub request_timeout_ms: u64,
    pub max_concurrent_lookups: usize,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            api_key: None,
            max_candidates: 10,
            min_similarity: 0.3,
            request_timeout_ms: 8_000,
            max_concurrent_lookups: 4,
        }
    }
}

impl NutritionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// Sentence-transformer ONNX model run in-process
    Local,
    /// OpenAI-compatible `/embeddings` endpoint
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    pub remote_base_url: String,
    pub remote_model: String,
    pub api_key: Option<String>,
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Local,
            model_path: None,
            tokenizer_path: None,
            remote_base_url: "https://api.openai.com/v1".to_string(),
            remote_model: "text-embedding-3-small".to_string(),
            api_key: None,
            cache_capacity: 10_000,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MorselConfig {
    pub detection: DetectionConfig,
    pub calibration: CalibrationConfig,
    pub portion: PortionConfig,
    pub nutrition: NutritionConfig,
    pub embedding: EmbeddingConfig,
}

impl MorselConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<MorselConfig>(content) {
            return Ok(config);
        }

        let toml_err = match toml::from_str::<MorselConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        if let Ok(config) = serde_yaml::from_str::<MorselConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::ParseError(toml_err.to_string()))
    }

    /// Apply overrides from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// The `MORSEL_*` names win over the vendor-conventional ones.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(key) = first(&["MORSEL_USDA_API_KEY", "USDA_API_KEY"]) {
            self.nutrition.api_key = Some(key);
        }
        if let Some(key) = first(&["MORSEL_VISION_API_KEY", "GOOGLE_API_KEY"]) {
            self.detection.vision_api_key = Some(key);
        }
        if let Some(key) = first(&["MORSEL_EMBEDDING_API_KEY", "OPENAI_API_KEY"]) {
            self.embedding.api_key = Some(key);
        }
        if let Some(mode) = first(&["MORSEL_DETECTOR_MODE"]) {
            match mode.parse::<DetectorMode>() {
                Ok(mode) => self.detection.mode = mode,
                Err(e) => tracing::warn!("Ignoring MORSEL_DETECTOR_MODE: {}", e),
            }
        }
        if let Some(dir) = first(&["MORSEL_MODEL_DIR"]) {
            self.detection.model_dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::ValidationError(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };

        unit("detection.cloud_confidence_threshold", self.detection.cloud_confidence_threshold)?;
        unit("detection.local_confidence_threshold", self.detection.local_confidence_threshold)?;
        unit("detection.nms_iou_threshold", self.detection.nms_iou_threshold)?;
        unit("nutrition.min_similarity", self.nutrition.min_similarity)?;
        unit("portion.no_reference_confidence_factor", self.portion.no_reference_confidence_factor)?;

        if self.detection.input_size == 0 || self.detection.input_size > 4096 {
            return Err(ConfigError::ValidationError(
                "detection.input_size must be between 1 and 4096".to_string(),
            ));
        }

        let cal = &self.calibration;
        if !(cal.min_pixels_per_cm > 0.0 && cal.min_pixels_per_cm < cal.max_pixels_per_cm) {
            return Err(ConfigError::ValidationError(
                "calibration bounds must satisfy 0 < min_pixels_per_cm < max_pixels_per_cm".to_string(),
            ));
        }

        if !(self.portion.assumed_image_area > 0.0) || !(self.portion.max_dimension_cm > 0.0) {
            return Err(ConfigError::ValidationError(
                "portion.assumed_image_area and portion.max_dimension_cm must be > 0".to_string(),
            ));
        }

        if let Some((key, grams)) = self
            .portion
            .max_weight_overrides
            .iter()
            .find(|(_, g)| !(**g > 0.0))
        {
            return Err(ConfigError::ValidationError(format!(
                "portion.max_weight_overrides.{} must be > 0, got {}",
                key, grams
            )));
        }

        if self.nutrition.max_candidates == 0 {
            return Err(ConfigError::ValidationError(
                "nutrition.max_candidates must be > 0".to_string(),
            ));
        }

        if self.nutrition.max_concurrent_lookups == 0 {
            return Err(ConfigError::ValidationError(
                "nutrition.max_concurrent_lookups must be > 0".to_string(),
            ));
        }

        if self.nutrition.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "nutrition.request_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy with every credential reduced to a short prefix, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for key in [
            &mut copy.detection.vision_api_key,
            &mut copy.nutrition.api_key,
            &mut copy.embedding.api_key,
        ] {
            if let Some(k) = key.as_mut() {
                *k = redact(k);
            }
        }
        copy
    }
}

/// Keep at most the first four characters of a secret.
pub fn redact(secret: &str) -> String {
    if secret.chars().count() > 8 {
        format!("{}***", secret.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Configuration(err.to_string())
    }
}
