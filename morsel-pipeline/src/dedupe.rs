use morsel_core::DetectedFoodItem;
use std::collections::HashMap;

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Keep one item per case-insensitive name: the one with the highest
/// detector confidence (the first seen on a tie).
pub fn dedupe_by_name(items: Vec<DetectedFoodItem>) -> Vec<DetectedFoodItem> {
    let mut kept: Vec<DetectedFoodItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = name_key(&item.name);
        match index.get(&key) {
            Some(&i) if item.confidence > kept[i].confidence => kept[i] = item,
            Some(_) => {}
            None => {
                index.insert(key, kept.len());
                kept.push(item);
            }
        }
    }
    kept
}

/// Highest confidence first.
pub fn sort_by_confidence(items: &mut [DetectedFoodItem]) {
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

pub fn finalize(items: Vec<DetectedFoodItem>) -> Vec<DetectedFoodItem> {
    let mut items = dedupe_by_name(items);
    sort_by_confidence(&mut items);
    items
}
