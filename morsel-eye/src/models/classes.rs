//! Class vocabulary of the local food detector

use crate::error::{Result, VisionError};
use std::path::Path;

/// Output classes of the bundled food detection model, in output order.
pub const FOOD_CLASSES: &[&str] = &[
    "hot-dog", "Apple", "Artichoke", "Asparagus", "Bagel", "Baked-goods", "Banana", "Beer",
    "Bell-pepper", "Bread", "Broccoli", "Burrito", "Cabbage", "Cake", "Candy", "Cantaloupe",
    "Carrot", "Common-fig", "Cookie", "Dessert", "French-fries", "Grape", "Guacamole",
    "Hot-dog", "Ice-cream", "Muffin", "Orange", "Pancake", "Pear", "Popcorn", "Pretzel",
    "Strawberry", "Tomato", "Waffle", "food-drinks", "Cheese", "Cocktail", "Coffee",
    "Cooking-spray", "Crab", "Croissant", "Cucumber", "Doughnut", "Egg", "Fruit", "Grapefruit",
    "Hamburger", "Honeycomb", "Juice", "Lemon", "Lobster", "Mango", "Milk", "Mushroom",
    "Oyster", "Pasta", "Pastry", "Peach", "Pineapple", "Pizza", "Pomegranate", "Potato",
    "Pumpkin", "Radish", "Salad", "food", "Sandwich", "Shrimp", "Squash", "Squid",
    "Submarine-sandwich", "Sushi", "Taco", "Tart", "Tea", "Vegetable", "Watermelon", "Wine",
    "Winter-melon", "Zucchini", "Banh_mi", "Banh_trang_tron", "Banh_xeo", "Bun_bo_Hue",
    "Bun_dau", "Com_tam", "Goi_cuon", "Pho", "Hu_tieu", "Xoi",
];

/// Class names from a newline-delimited file, or the built-in food classes.
pub fn load_class_names(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(FOOD_CLASSES.iter().map(|s| s.to_string()).collect());
    };

    let content = std::fs::read_to_string(path)?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(VisionError::Config(format!(
            "Label file {} contains no class names",
            path.display()
        )));
    }
    Ok(names)
}

/// Detector class names use dashes and underscores as word separators.
pub fn display_label(class_name: &str) -> String {
    class_name.replace(|c: char| c == '-' || c == '_', " ")
}
