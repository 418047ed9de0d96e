//! Error types for morsel-eye

use morsel_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials rejected by {0}")]
    Unauthorized(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),
}

impl From<ort::Error> for VisionError {
    fn from(err: ort::Error) -> Self {
        VisionError::Ort(err.to_string())
    }
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Image(e) => CoreError::Image(e.to_string()),
            VisionError::Config(msg) => CoreError::Configuration(msg),
            VisionError::Geometry(msg) => CoreError::InvalidGeometry(msg),
            other => CoreError::DetectorUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;
