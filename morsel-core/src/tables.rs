//! Static lookup tables for calibration, portion heuristics and energy fallbacks
//!
//! All tables are ordered: lookups return the first matching entry.

use crate::labels::label_words;
use crate::types::{FoodCategory, ReferenceObjectSpec, ShapeClass};

/// Objects of known physical size, in centimeters.
pub const REFERENCE_OBJECTS: &[ReferenceObjectSpec] = &[
    ReferenceObjectSpec { name: "coin", real_size_cm: 2.4, shape: ShapeClass::Circular },
    ReferenceObjectSpec { name: "penny", real_size_cm: 1.9, shape: ShapeClass::Circular },
    ReferenceObjectSpec { name: "spoon", real_size_cm: 15.0, shape: ShapeClass::Elongated },
    ReferenceObjectSpec { name: "fork", real_size_cm: 18.0, shape: ShapeClass::Elongated },
    ReferenceObjectSpec { name: "knife", real_size_cm: 20.0, shape: ShapeClass::Elongated },
    ReferenceObjectSpec { name: "cup", real_size_cm: 8.5, shape: ShapeClass::Planar },
    ReferenceObjectSpec { name: "plate", real_size_cm: 25.0, shape: ShapeClass::Planar },
    ReferenceObjectSpec { name: "phone", real_size_cm: 14.0, shape: ShapeClass::Planar },
    ReferenceObjectSpec { name: "hand", real_size_cm: 18.0, shape: ShapeClass::Planar },
    ReferenceObjectSpec { name: "finger", real_size_cm: 7.5, shape: ShapeClass::Planar },
];

/// Densities in g/cm³, matched by label substring.
pub const DENSITIES: &[(&str, f32)] = &[
    ("apple", 0.8),
    ("banana", 0.9),
    ("orange", 0.87),
    ("grape", 0.85),
    ("cantaloupe", 0.85),
    ("melon", 0.85),
    ("pumpkin", 0.8),
    ("bread", 0.3),
    ("cake", 0.5),
    ("meat", 1.0),
    ("chicken", 1.0),
    ("beef", 1.0),
    ("fish", 1.0),
    ("egg", 1.0),
    ("cheese", 1.1),
    ("rice", 0.75),
    ("pasta", 0.65),
    ("potato", 0.8),
    ("carrot", 0.9),
    ("broccoli", 0.3),
];

pub const DEFAULT_DENSITY: f32 = 0.8;

/// Plausible upper bound for one detected portion, in grams.
pub const MAX_WEIGHTS: &[(&str, f32)] = &[
    ("grape", 10.0),
    ("berry", 10.0),
    ("egg", 80.0),
    ("apple", 300.0),
    ("banana", 200.0),
    ("orange", 300.0),
    ("pumpkin", 500.0),
    ("cantaloupe", 1000.0),
    ("melon", 1000.0),
    ("bread", 100.0),
    ("meat", 400.0),
    ("chicken", 400.0),
    ("beef", 400.0),
];

pub const DEFAULT_MAX_WEIGHT: f32 = 500.0;

/// Typical single serving in grams, used when no scale is available.
pub const DEFAULT_PORTIONS: &[(&str, f32)] = &[
    ("apple", 150.0),
    ("banana", 120.0),
    ("orange", 180.0),
    ("bread", 30.0),
    ("slice", 50.0),
    ("cup", 200.0),
];

/// Serving used when a label has no entry in [`DEFAULT_PORTIONS`].
pub const FALLBACK_PORTION: f32 = 100.0;

/// Rough kcal per 100 g by food family, for records without an energy value.
pub const CALORIE_FALLBACKS: &[(&[&str], f32)] = &[
    (&["tomato", "cucumber", "lettuce", "spinach", "bell pepper", "broccoli"], 25.0),
    (&["apple", "orange", "strawberry", "melon"], 50.0),
    (&["avocado"], 160.0),
    (&["bean", "lentil", "chickpea", "pea"], 120.0),
    (&["rice", "quinoa", "oats", "barley"], 130.0),
    (&["chicken", "fish", "tofu", "egg"], 150.0),
    (&["nut", "seed", "almond", "walnut"], 580.0),
];

pub const DEFAULT_CALORIES_PER_100G: f32 = 100.0;

/// Category keywords, matched as whole words.
pub const CATEGORY_KEYWORDS: &[(FoodCategory, &[&str])] = &[
    (
        FoodCategory::Fruit,
        &["apple", "banana", "orange", "grape", "strawberry", "blueberry", "pear", "peach"],
    ),
    (
        FoodCategory::Vegetable,
        &["carrot", "broccoli", "spinach", "tomato", "cucumber", "onion", "pepper"],
    ),
    (
        FoodCategory::Protein,
        &["chicken", "beef", "fish", "pork", "turkey", "meat"],
    ),
    (FoodCategory::Grain, &["bread", "rice", "pasta", "cereal", "oats"]),
    (FoodCategory::Dairy, &["milk", "cheese", "yogurt", "butter"]),
];

fn lookup(table: &[(&str, f32)], label: &str) -> Option<f32> {
    let lower = label.to_lowercase();
    table
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, value)| *value)
}

/// Registry entry for a label, matched on whole words (singular or plural).
///
/// `"Kitchen knife"` resolves to `knife`, `"cupcake"` does not resolve to `cup`.
pub fn find_reference_object(label: &str) -> Option<&'static ReferenceObjectSpec> {
    let words = label_words(label);
    REFERENCE_OBJECTS.iter().find(|spec| {
        words.iter().any(|w| {
            w == spec.name || w.strip_suffix('s').map_or(false, |s| s == spec.name)
        })
    })
}

pub fn density_for(label: &str) -> f32 {
    lookup(DENSITIES, label).unwrap_or(DEFAULT_DENSITY)
}

pub fn max_weight_for(label: &str) -> f32 {
    lookup(MAX_WEIGHTS, label).unwrap_or(DEFAULT_MAX_WEIGHT)
}

pub fn default_portion_for(label: &str) -> Option<f32> {
    lookup(DEFAULT_PORTIONS, label)
}

/// Keyword-based energy estimate from a food description.
pub fn fallback_calories_per_100g(description: &str) -> f32 {
    let lower = description.to_lowercase();
    CALORIE_FALLBACKS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, kcal)| *kcal)
        .unwrap_or(DEFAULT_CALORIES_PER_100G)
}
