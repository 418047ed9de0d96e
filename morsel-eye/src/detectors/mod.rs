//! Detector back-ends

pub mod cloud;
pub mod fallback;
pub mod fixed;
pub mod yolo;

pub use cloud::CloudVisionDetector;
pub use fallback::FallbackDetector;
pub use fixed::StaticDetector;
pub use yolo::YoloDetector;
