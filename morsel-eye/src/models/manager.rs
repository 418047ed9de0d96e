//! Model manager with auto-download functionality

use crate::error::VisionError;
use morsel_core::DetectionConfig;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const MAX_MODEL_SIZE: u64 = 2_000_000_000;
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Downloads and locates ONNX model files under one directory.
pub struct ModelManager {
    model_dir: PathBuf,
}

impl ModelManager {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Ensure model directory exists
    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        if !self.model_dir.exists() {
            fs::create_dir_all(&self.model_dir)?;
            info!("Created model directory: {:?}", self.model_dir);
        }
        Ok(self.model_dir.clone())
    }

    /// Download model if not present
    pub async fn ensure_model(
        &self,
        model_name: &str,
        url: &str,
        checksum: Option<&str>,
    ) -> Result<PathBuf, VisionError> {
        validate_model_name(model_name)?;

        let model_path = self.model_dir.join(model_name);
        if model_path.exists() {
            info!("Model {} already exists at {:?}", model_name, model_path);
            return Ok(model_path);
        }

        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid URL".to_string()));
        }
        if !url.starts_with("https://") {
            return Err(VisionError::Model(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        self.ensure_model_dir()?;
        info!("Downloading model {} from {}", model_name, url);

        let client = reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(VisionError::Model(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;
        self.store(model_name, &bytes, checksum)
    }

    /// Validate and atomically write downloaded model bytes.
    pub fn store(
        &self,
        model_name: &str,
        bytes: &[u8],
        checksum: Option<&str>,
    ) -> Result<PathBuf, VisionError> {
        validate_model_name(model_name)?;

        if bytes.len() as u64 > MAX_MODEL_SIZE {
            return Err(VisionError::Model(format!(
                "Downloaded model too large: {} bytes",
                bytes.len()
            )));
        }
        if bytes.len() < MIN_MODEL_SIZE {
            return Err(VisionError::Model(
                "Downloaded file too small, likely corrupted".to_string(),
            ));
        }

        match checksum.filter(|c| !c.is_empty()) {
            Some(expected) => {
                verify_checksum(bytes, expected)?;
                info!("Verified checksum for model {}", model_name);
            }
            None => info!(
                "Downloaded {} bytes for model {} (checksum verification skipped)",
                bytes.len(),
                model_name
            ),
        }

        self.ensure_model_dir()?;
        let model_path = self.model_dir.join(model_name);
        let temp_path = model_path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &model_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            VisionError::Io(e)
        })?;

        info!("Model {} saved to {:?}", model_name, model_path);
        Ok(model_path)
    }

    /// Resolve the detector model described by `config`, downloading it when
    /// absent and a URL is configured.
    pub async fn ensure_detector_model(&self, config: &DetectionConfig) -> Result<PathBuf, VisionError> {
        let path = self.model_dir.join(&config.model_file);
        if path.exists() {
            return Ok(path);
        }
        match config.model_url.as_deref() {
            Some(url) => {
                self.ensure_model(&config.model_file, url, config.model_sha256.as_deref())
                    .await
            }
            None => Err(VisionError::Model(format!(
                "Model {:?} not found and no download URL configured",
                path
            ))),
        }
    }
}

fn validate_model_name(model_name: &str) -> Result<(), VisionError> {
    if model_name.is_empty() || model_name.len() > 255 {
        return Err(VisionError::Model("Invalid model name".to_string()));
    }
    if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
        return Err(VisionError::Model(
            "Model name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Compare the SHA-256 of `bytes` with a hex digest, case-insensitively.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), VisionError> {
    let computed = hex::encode(Sha256::digest(bytes));
    if computed.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(VisionError::Model(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, computed
        )))
    }
}
