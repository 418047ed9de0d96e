//! morsel-core: shared data model for the food analysis pipeline
//!
//! Holds the types that flow between detection, calibration, portion
//! estimation and nutrition matching, together with the error taxonomy,
//! runtime configuration and the immutable lookup tables the heuristics
//! are built on.

pub mod config;
pub mod error;
pub mod labels;
pub mod tables;
pub mod types;

pub use config::{
    CalibrationConfig, ConfigError, DetectionConfig, DetectorMode, EmbeddingConfig,
    EmbeddingProviderKind, MorselConfig, NutritionConfig, PortionConfig,
};
pub use error::{Error, Result};
pub use types::*;
