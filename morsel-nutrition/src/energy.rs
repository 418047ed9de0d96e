//! Energy and macronutrient extraction from FoodData Central detail payloads
//!
//! Two nutrient shapes are accepted. The abridged format lists flat entries
//! (`{"number": "208", "name": "Energy", "amount": 52, "unitName": "KCAL"}`);
//! the full format nests the nutrient description
//! (`{"nutrient": {"number": "208", ...}, "amount": 52}`).

use morsel_core::tables::fallback_calories_per_100g;
use morsel_core::{NutrientProfile, NutritionRecord};
use serde_json::Value;
use tracing::{debug, warn};

pub const ENERGY_KCAL: &str = "208";
pub const PROTEIN: &str = "203";
pub const FAT: &str = "204";
pub const CARBOHYDRATE: &str = "205";
pub const FIBER: &str = "291";
pub const SUGARS: &str = "269";

/// Nutrient numbers requested from the detail endpoint.
pub const REQUESTED_NUTRIENTS: &str = "208,203,204,205,291,269";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientEntry {
    pub number: Option<String>,
    pub name: Option<String>,
    pub amount: Option<f32>,
    pub unit: Option<String>,
}

/// Read a field that may be encoded as a string or a number.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_field(value: &Value) -> Option<f32> {
    ["amount", "value"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
        .map(|v| v as f32)
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_entry(entry: &Value) -> NutrientEntry {
    let described = entry.get("nutrient").unwrap_or(entry);
    NutrientEntry {
        number: text_field(described, "number").or_else(|| text_field(entry, "nutrientNumber")),
        name: text_field(described, "name").or_else(|| text_field(entry, "nutrientName")),
        amount: amount_field(entry),
        unit: text_field(described, "unitName"),
    }
}

pub fn nutrient_entries(detail: &Value) -> Vec<NutrientEntry> {
    detail
        .get("foodNutrients")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(parse_entry).collect())
        .unwrap_or_default()
}

fn amount_by_number(entries: &[NutrientEntry], number: &str) -> Option<f32> {
    entries
        .iter()
        .filter(|e| e.number.as_deref() == Some(number))
        .find_map(|e| e.amount)
}

/// kcal per 100 g: nutrient 208 first, then any energy/calorie entry not in kJ.
pub fn energy_kcal(entries: &[NutrientEntry]) -> Option<f32> {
    if let Some(kcal) = amount_by_number(entries, ENERGY_KCAL) {
        return Some(kcal);
    }

    entries.iter().find_map(|e| {
        let name = e.name.as_deref()?.to_lowercase();
        let is_energy = name.contains("energy") || name.contains("calorie");
        let in_kilojoules = e
            .unit
            .as_deref()
            .map_or(false, |u| u.eq_ignore_ascii_case("kj"));
        if is_energy && !in_kilojoules {
            debug!("Energy found by name: {} = {:?}", name, e.amount);
            e.amount
        } else {
            None
        }
    })
}

pub fn macronutrients(entries: &[NutrientEntry]) -> NutrientProfile {
    NutrientProfile {
        protein_g: amount_by_number(entries, PROTEIN),
        fat_g: amount_by_number(entries, FAT),
        carbohydrate_g: amount_by_number(entries, CARBOHYDRATE),
        fiber_g: amount_by_number(entries, FIBER),
        sugar_g: amount_by_number(entries, SUGARS),
    }
}

/// Build a record from a detail payload. When no energy value is present the
/// calorie density is estimated from the description.
pub fn record_from_detail(external_id: &str, fallback_description: &str, detail: &Value) -> NutritionRecord {
    let description = detail
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(fallback_description)
        .to_string();

    let entries = nutrient_entries(detail);
    let calories_per_100g = match energy_kcal(&entries) {
        Some(kcal) => kcal,
        None => {
            let estimate = fallback_calories_per_100g(&description);
            warn!(
                "No energy value for '{}' ({}), using estimate {:.1} kcal/100g",
                description, external_id, estimate
            );
            estimate
        }
    };

    NutritionRecord {
        external_id: external_id.to_string(),
        description,
        calories_per_100g,
        nutrients: macronutrients(&entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_abridged_shape() {
        let detail = json!({
            "description": "Apples, raw, with skin",
            "foodNutrients": [
                {"number": "203", "name": "Protein", "amount": 0.26, "unitName": "G"},
                {"number": "208", "name": "Energy", "amount": 52.0, "unitName": "KCAL"},
                {"number": "291", "name": "Fiber, total dietary", "amount": 2.4, "unitName": "G"}
            ]
        });
        let record = record_from_detail("171688", "apple", &detail);
        assert_eq!(record.description, "Apples, raw, with skin");
        assert_eq!(record.calories_per_100g, 52.0);
        assert_eq!(record.nutrients.protein_g, Some(0.26));
        assert_eq!(record.nutrients.fiber_g, Some(2.4));
        assert_eq!(record.nutrients.fat_g, None);
    }

    #[test]
    fn test_full_shape() {
        let detail = json!({
            "foodNutrients": [
                {"nutrient": {"id": 1008, "number": "208", "name": "Energy", "unitName": "kcal"}, "amount": 89.0},
                {"nutrient": {"id": 1005, "number": "205", "name": "Carbohydrate, by difference", "unitName": "g"}, "amount": 22.8}
            ]
        });
        let record = record_from_detail("173944", "Bananas, raw", &detail);
        assert_eq!(record.description, "Bananas, raw");
        assert_eq!(record.calories_per_100g, 89.0);
        assert_eq!(record.nutrients.carbohydrate_g, Some(22.8));
    }

    #[test]
    fn test_energy_by_name_skips_kilojoules() {
        let entries = nutrient_entries(&json!({
            "foodNutrients": [
                {"name": "Energy", "amount": 218.0, "unitName": "kJ"},
                {"name": "Energy (Atwater General Factors)", "amount": 52.0, "unitName": "KCAL"}
            ]
        }));
        assert_eq!(energy_kcal(&entries), Some(52.0));
    }

    #[test]
    fn test_numeric_nutrient_number() {
        let entries = nutrient_entries(&json!({
            "foodNutrients": [{"number": 208, "amount": 31}]
        }));
        assert_eq!(energy_kcal(&entries), Some(31.0));
    }

    #[test]
    fn test_missing_energy_falls_back_to_keywords() {
        let detail = json!({"description": "Avocados, raw", "foodNutrients": []});
        assert_eq!(record_from_detail("1", "", &detail).calories_per_100g, 160.0);

        let detail = json!({"description": "Mystery stew"});
        assert_eq!(record_from_detail("2", "", &detail).calories_per_100g, 100.0);
    }

    #[test]
    fn test_negative_amounts_ignored() {
        let entries = nutrient_entries(&json!({
            "foodNutrients": [{"number": "208", "amount": -5.0}]
        }));
        assert_eq!(energy_kcal(&entries), None);
    }
}
