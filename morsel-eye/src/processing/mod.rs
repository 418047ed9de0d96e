//! Post-detection geometry: overlap suppression, scale calibration and portion sizing

pub mod calibration;
pub mod nms;
pub mod portion;
pub mod preprocess;

pub use calibration::{partition_references, ReferenceDetection, ScaleCalibrator};
pub use nms::apply_nms;
pub use portion::PortionEstimator;
