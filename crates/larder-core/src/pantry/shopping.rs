use std::collections::HashMap;

use crate::model::{DayPlan, Ingredient};

use super::{PantryArithmeticError, PantryItem, check_pantry, normalize_name, required_grams};

/// Shortfalls at or below this many grams are float noise, not purchases.
pub const SHOPPING_EPSILON_GRAMS: f64 = 1e-6;

/// What must be bought to cook every day in `days` from `initial_pantry`.
///
/// Requirements are summed over the whole plan and compared against the
/// pantry as it was before the first day. Entries appear in the order the
/// ingredient first occurs in the plan and use the pantry's spelling of the
/// name when the household has one, otherwise the normalized name.
pub fn shopping_list(
    days: &[DayPlan],
    initial_pantry: &[PantryItem],
) -> Result<Vec<Ingredient>, PantryArithmeticError> {
    check_pantry(initial_pantry)?;
    let required = required_grams(days.iter().flat_map(|day| day.meals.iter()))?;

    let mut available: HashMap<String, f64> = HashMap::new();
    let mut display: HashMap<String, &str> = HashMap::new();
    for item in initial_pantry {
        let key = normalize_name(&item.name);
        *available.entry(key.clone()).or_default() += item.quantity_grams;
        display.entry(key).or_insert(item.name.as_str());
    }

    let list = required
        .iter()
        .filter_map(|(key, needed)| {
            let missing = needed - available.get(key).copied().unwrap_or(0.0);
            (missing > SHOPPING_EPSILON_GRAMS).then(|| Ingredient {
                name: display.get(key).map_or_else(|| key.to_string(), |n| n.to_string()),
                quantity_grams: missing,
            })
        })
        .collect();
    Ok(list)
}

/// Combine shopping entries that share a normalized name.
///
/// The first spelling seen wins and first-seen order is kept.
pub fn merge_shopping_lists(items: &[Ingredient]) -> Vec<Ingredient> {
    let mut merged: Vec<Ingredient> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        let key = normalize_name(&item.name);
        match index.get(&key) {
            Some(&i) => merged[i].quantity_grams += item.quantity_grams,
            None => {
                index.insert(key, merged.len());
                merged.push(item.clone());
            }
        }
    }
    merged
}
