//! Label normalization shared by the orchestrator and the nutrition matcher

use crate::tables::CATEGORY_KEYWORDS;
use crate::types::FoodCategory;

/// Words that describe preparation or freshness rather than the food itself.
const QUALIFIERS: &[&str] = &[
    "fresh", "raw", "organic", "natural", "ripe", "sliced", "diced", "chopped", "whole",
];

/// Query rewrites that line detector vocabulary up with database naming.
const QUERY_MAPPINGS: &[(&str, &str)] = &[
    ("cherry tomato", "tomato cherry"),
    ("black bean", "beans black"),
    ("white bean", "beans white"),
    ("kidney bean", "beans kidney"),
];

/// Lowercased alphanumeric words of a label.
pub fn label_words(label: &str) -> Vec<String> {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn letters_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a detector label into a food name: lowercase, no qualifiers,
/// letters only, single spaces. May return an empty string.
pub fn clean_label(label: &str) -> String {
    let words: Vec<String> = label
        .to_lowercase()
        .split_whitespace()
        .map(letters_only)
        .filter(|w| !w.is_empty() && !QUALIFIERS.contains(&w.as_str()))
        .collect();
    words.join(" ")
}

/// Normalize a food name into a nutrition database search query.
pub fn clean_query(name: &str) -> String {
    let mut cleaned = name.trim().to_lowercase();
    for noise in ["fresh ", "raw ", "organic ", " leaf", " leaves"] {
        cleaned = cleaned.replace(noise, "");
    }

    if let Some((_, mapped)) = QUERY_MAPPINGS.iter().find(|(from, _)| cleaned.contains(from)) {
        cleaned = (*mapped).to_string();
    }

    collapse_whitespace(&letters_only(&cleaned))
}

/// Title-case each word of a cleaned label.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn categorize(name: &str) -> FoodCategory {
    let words = label_words(name);
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(category, _)| *category)
        .unwrap_or(FoodCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_label_strips_qualifiers() {
        assert_eq!(clean_label("Fresh Sliced Apple"), "apple");
        assert_eq!(clean_label("  Organic   RIPE banana "), "banana");
        assert_eq!(clean_label("hot-dog"), "hotdog");
        assert_eq!(clean_label("Apple 2"), "apple");
    }

    #[test]
    fn test_clean_label_can_be_empty() {
        assert_eq!(clean_label("fresh"), "");
        assert_eq!(clean_label("123"), "");
    }

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("Fresh spinach leaves"), "spinach");
        assert_eq!(clean_query("basil leaf"), "basil");
        assert_eq!(clean_query("Raw cherry tomatoes"), "tomato cherry");
        assert_eq!(clean_query("canned black beans"), "beans black");
        assert_eq!(clean_query("Bell-pepper!"), "bellpepper");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("green apple"), "Green Apple");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("green apple"), FoodCategory::Fruit);
        assert_eq!(categorize("Broccoli"), FoodCategory::Vegetable);
        assert_eq!(categorize("grilled chicken"), FoodCategory::Protein);
        assert_eq!(categorize("brown rice"), FoodCategory::Grain);
        assert_eq!(categorize("greek yogurt"), FoodCategory::Dairy);
        assert_eq!(categorize("pizza"), FoodCategory::Other);
        assert_eq!(categorize("pineapple"), FoodCategory::Other);
    }
}
