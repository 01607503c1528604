//! Pantry arithmetic: name normalization, consumption, and shopping lists.
//!
//! Everything here is pure. Ingredients are matched to pantry items by
//! normalized name only (trimmed, lowercased, internal whitespace
//! collapsed); there is no unit conversion or synonym matching.

mod depletion;
mod shopping;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_db::models::PantryEntry;

use crate::model::PlannedMeal;

pub use depletion::{consume, deplete};
pub use shopping::{SHOPPING_EPSILON_GRAMS, merge_shopping_lists, shopping_list};

/// A quantity of an ingredient the household currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    pub name: String,
    pub quantity_grams: f64,
    /// Marked by the household as "use soon".
    #[serde(default, alias = "need_to_use")]
    pub flagged_for_use: bool,
}

impl PantryItem {
    pub fn new(name: impl Into<String>, quantity_grams: f64) -> Self {
        Self {
            name: name.into(),
            quantity_grams,
            flagged_for_use: false,
        }
    }

    pub fn flagged(mut self) -> Self {
        self.flagged_for_use = true;
        self
    }
}

impl From<PantryEntry> for PantryItem {
    fn from(entry: PantryEntry) -> Self {
        Self {
            name: entry.name,
            quantity_grams: entry.quantity_grams,
            flagged_for_use: entry.flagged_for_use,
        }
    }
}

/// Invalid numbers reaching the pantry engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PantryArithmeticError {
    #[error("pantry item {name:?} has invalid quantity {quantity} g")]
    InvalidPantryQuantity { name: String, quantity: f64 },

    #[error("ingredient {name:?} has invalid quantity {quantity} g")]
    InvalidIngredientQuantity { name: String, quantity: f64 },
}

/// Canonical matching key for an ingredient or pantry name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_valid_quantity(quantity: f64) -> bool {
    quantity.is_finite() && quantity >= 0.0
}

pub(crate) fn check_pantry(items: &[PantryItem]) -> Result<(), PantryArithmeticError> {
    match items.iter().find(|i| !is_valid_quantity(i.quantity_grams)) {
        Some(item) => Err(PantryArithmeticError::InvalidPantryQuantity {
            name: item.name.clone(),
            quantity: item.quantity_grams,
        }),
        None => Ok(()),
    }
}

/// Grams keyed by normalized name, remembering the order in which each
/// name was first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GramsByName {
    order: Vec<String>,
    totals: HashMap<String, f64>,
}

impl GramsByName {
    fn add(&mut self, key: String, grams: f64) {
        match self.totals.get_mut(&key) {
            Some(total) => *total += grams,
            None => {
                self.order.push(key.clone());
                self.totals.insert(key, grams);
            }
        }
    }

    /// Total grams for a normalized name (0 when absent).
    pub fn get(&self, key: &str) -> f64 {
        self.totals.get(key).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(|key| (key.as_str(), self.totals[key]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sum ingredient grams across `meals` per normalized name.
///
/// Names that normalize to the empty string and zero quantities are
/// skipped. Negative or non-finite quantities are an error.
pub fn required_grams<'a>(
    meals: impl IntoIterator<Item = &'a PlannedMeal>,
) -> Result<GramsByName, PantryArithmeticError> {
    let mut required = GramsByName::default();
    for ingredient in meals.into_iter().flat_map(|m| m.ingredients.iter()) {
        if !is_valid_quantity(ingredient.quantity_grams) {
            return Err(PantryArithmeticError::InvalidIngredientQuantity {
                name: ingredient.name.clone(),
                quantity: ingredient.quantity_grams,
            });
        }
        let key = normalize_name(&ingredient.name);
        if key.is_empty() || ingredient.quantity_grams == 0.0 {
            continue;
        }
        required.add(key, ingredient.quantity_grams);
    }
    Ok(required)
}


#[cfg(test)]
mod tests {
    use super::test_support::meal;
    use super::*;

    #[test]
    fn normalize_trims_lowercases_and_collapses() {
        assert_eq!(normalize_name("  Chicken   Breast "), "chicken breast");
        assert_eq!(normalize_name("SOY\tsauce"), "soy sauce");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn required_grams_sums_by_normalized_name_in_first_seen_order() {
        let meals = vec![
            meal("a", &[("Rice", 100.0), ("garlic", 10.0)]),
            meal("b", &[("rice ", 150.0), ("  Onion", 80.0)]),
        ];
        let required = required_grams(&meals).unwrap();
        let collected: Vec<(&str, f64)> = required.iter().collect();
        assert_eq!(
            collected,
            vec![("rice", 250.0), ("garlic", 10.0), ("onion", 80.0)]
        );
        assert_eq!(required.get("missing"), 0.0);
    }

    #[test]
    fn required_grams_skips_blank_names_and_zero_quantities() {
        let meals = vec![meal("a", &[("  ", 10.0), ("salt", 0.0), ("egg", 50.0)])];
        let required = required_grams(&meals).unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required.get("egg"), 50.0);
    }

    #[test]
    fn required_grams_rejects_negative_and_nan() {
        let negative = vec![meal("a", &[("egg", -1.0)])];
        assert!(matches!(
            required_grams(&negative),
            Err(PantryArithmeticError::InvalidIngredientQuantity { .. })
        ));

        let nan = vec![meal("a", &[("egg", f64::NAN)])];
        assert!(required_grams(&nan).is_err());
    }

    #[test]
    fn pantry_item_accepts_need_to_use_alias() {
        let item: PantryItem =
            serde_json::from_str(r#"{"name":"milk","quantity_grams":500,"need_to_use":true}"#)
                .unwrap();
        assert!(item.flagged_for_use);

        let item: PantryItem =
            serde_json::from_str(r#"{"name":"milk","quantity_grams":500}"#).unwrap();
        assert!(!item.flagged_for_use);
    }
}
