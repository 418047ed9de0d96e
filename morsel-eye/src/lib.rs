//! morsel-eye: the vision half of the food analysis pipeline
//!
//! Turns an encoded photo into labeled boxes (through a cloud object
//! localization service or a local ONNX model), suppresses overlapping
//! boxes, derives a pixels-per-centimeter scale from known reference
//! objects, and sizes each food into a gram estimate.

pub mod detector;
pub mod detectors;
pub mod error;
pub mod models;
pub mod processing;

pub use detector::{build_detector, ObjectDetector};
pub use detectors::{CloudVisionDetector, FallbackDetector, StaticDetector, YoloDetector};
pub use error::VisionError;
pub use models::ModelManager;
pub use processing::preprocess::image_dimensions;
pub use processing::{apply_nms, partition_references, PortionEstimator, ReferenceDetection, ScaleCalibrator};
