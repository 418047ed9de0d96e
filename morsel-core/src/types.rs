//! Pipeline data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in pixel coordinates, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a box from center coordinates, as emitted by single-shot detectors.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when every coordinate is finite and the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Clip the box to `[0, image_width] x [0, image_height]`.
    pub fn clamp_to(&self, image_width: f32, image_height: f32) -> Self {
        let x1 = self.x.clamp(0.0, image_width);
        let y1 = self.y.clamp(0.0, image_height);
        let x2 = (self.x + self.width).clamp(0.0, image_width);
        let y2 = (self.y + self.height).clamp(0.0, image_height);
        Self::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }

    /// Intersection over union. Degenerate or non-finite boxes overlap nothing.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.is_valid() || !other.is_valid() {
            return 0.0;
        }

        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 || !union.is_finite() {
            return 0.0;
        }
        (intersection / union).clamp(0.0, 1.0)
    }
}

/// Which detector back-end produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Cloud,
    Local,
}

/// A labeled box straight out of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub source: DetectionSource,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox, source: DetectionSource) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            source,
        }
    }
}

/// How the representative pixel length of a reference object is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeClass {
    Circular,
    Elongated,
    Planar,
}

/// An object of known physical size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceObjectSpec {
    pub name: &'static str,
    pub real_size_cm: f32,
    pub shape: ShapeClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub reference_name: String,
    pub pixels_per_cm: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    ReferenceObject,
    DefaultScaling,
    Default,
}

impl EstimationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationMethod::ReferenceObject => "reference_object",
            EstimationMethod::DefaultScaling => "default_scaling",
            EstimationMethod::Default => "default",
        }
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortionEstimate {
    pub grams: f32,
    pub method: EstimationMethod,
    pub confidence: f32,
    pub reference_object_used: Option<String>,
    /// Only known when a scale was available.
    pub area_cm2: Option<f32>,
    pub volume_cm3: Option<f32>,
}

/// One hit from the cheap candidate search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionCandidate {
    pub external_id: String,
    pub description: String,
    pub data_type: String,
}

/// Macronutrients in grams. Stored per 100 g on a record, per portion on an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub protein_g: Option<f32>,
    pub fat_g: Option<f32>,
    pub carbohydrate_g: Option<f32>,
    pub fiber_g: Option<f32>,
    pub sugar_g: Option<f32>,
}

impl NutrientProfile {
    /// Scale a per-100 g profile to `grams`.
    pub fn scaled_to(&self, grams: f32) -> Self {
        let factor = grams / 100.0;
        let scale = |v: Option<f32>| v.map(|g| g * factor);
        Self {
            protein_g: scale(self.protein_g),
            fat_g: scale(self.fat_g),
            carbohydrate_g: scale(self.carbohydrate_g),
            fiber_g: scale(self.fiber_g),
            sugar_g: scale(self.sugar_g),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub external_id: String,
    pub description: String,
    pub calories_per_100g: f32,
    #[serde(default)]
    pub nutrients: NutrientProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodCategory {
    Fruit,
    Vegetable,
    Protein,
    Grain,
    Dairy,
    Other,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Fruit => "Fruit",
            FoodCategory::Vegetable => "Vegetable",
            FoodCategory::Protein => "Protein",
            FoodCategory::Grain => "Grain",
            FoodCategory::Dairy => "Dairy",
            FoodCategory::Other => "Other",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A food item in the final pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFoodItem {
    pub name: String,
    pub category: FoodCategory,
    /// Detector confidence; used for dedupe and ordering.
    pub confidence: f32,
    /// Confidence of the portion estimate.
    pub portion_confidence: f32,
    pub estimated_grams: f32,
    pub estimated_calories: f32,
    pub estimation_method: EstimationMethod,
    pub reference_object: Option<String>,
    pub bounding_box: BoundingBox,
    pub nutrition_source_id: String,
    /// Macronutrients for the estimated portion.
    #[serde(default)]
    pub nutrients: NutrientProfile,
}

/// Aggregate handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDetection {
    pub id: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub items: Vec<DetectedFoodItem>,
    pub created_at: DateTime<Utc>,
}

impl FoodDetection {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
        items: Vec<DetectedFoodItem>,
    ) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            content_type: content_type.into(),
            size_bytes,
            items,
            created_at: Utc::now(),
        }
    }

    pub fn total_calories(&self) -> f32 {
        self.items.iter().map(|i| i.estimated_calories).sum()
    }
}
