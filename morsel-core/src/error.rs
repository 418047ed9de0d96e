use thiserror::Error;

/// Failure modes of a single image analysis.
///
/// Only `DetectorUnavailable` (and configuration or image decoding problems)
/// fail a whole analysis. `NutritionLookupFailed` and `InvalidGeometry` are
/// raised per candidate and drop that candidate; `PersistenceFailed` is
/// logged by the caller and never replaces a computed result.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Nutrition lookup failed: {0}")]
    NutritionLookupFailed(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error only concerns one food candidate.
    pub fn is_candidate_scoped(&self) -> bool {
        matches!(
            self,
            Error::NutritionLookupFailed(_) | Error::InvalidGeometry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
