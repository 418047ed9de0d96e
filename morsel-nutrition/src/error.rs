use morsel_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NutritionError {
    #[error("API key not set for {0}")]
    MissingApiKey(String),

    #[error("Authentication failed for {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Food not found: {0}")]
    NotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ort::Error> for NutritionError {
    fn from(err: ort::Error) -> Self {
        NutritionError::Embedding(err.to_string())
    }
}

impl From<NutritionError> for CoreError {
    fn from(err: NutritionError) -> Self {
        match err {
            NutritionError::MissingApiKey(_) | NutritionError::Model(_) => {
                CoreError::Configuration(err.to_string())
            }
            NutritionError::Io(e) => CoreError::Io(e),
            other => CoreError::NutritionLookupFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, NutritionError>;
