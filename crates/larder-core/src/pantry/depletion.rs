use std::collections::HashMap;

use crate::model::PlannedMeal;

use super::{
    GramsByName, PantryArithmeticError, PantryItem, SHOPPING_EPSILON_GRAMS, check_pantry,
    normalize_name, required_grams,
};

/// Pantry left after cooking `consumed`.
///
/// Consumption is summed per normalized name first, then taken from
/// matching pantry items in pantry order. An item whose remainder is at
/// most [`SHOPPING_EPSILON_GRAMS`] (1e-6 g) is treated as used up and
/// dropped. Ingredients missing from the pantry are ignored. The input
/// slice is not modified.
pub fn deplete(
    pantry: &[PantryItem],
    consumed: &[PlannedMeal],
) -> Result<Vec<PantryItem>, PantryArithmeticError> {
    let required = required_grams(consumed)?;
    consume(pantry, &required)
}

/// Take `required` grams out of `pantry`, clamping every item at zero.
///
/// Remainders of [`SHOPPING_EPSILON_GRAMS`] or less are dropped.
pub fn consume(
    pantry: &[PantryItem],
    required: &GramsByName,
) -> Result<Vec<PantryItem>, PantryArithmeticError> {
    check_pantry(pantry)?;

    let mut outstanding: HashMap<&str, f64> = required.iter().collect();
    let mut remaining = Vec::with_capacity(pantry.len());

    for item in pantry {
        let key = normalize_name(&item.name);
        let taken = match outstanding.get_mut(key.as_str()) {
            Some(wanted) => {
                let taken = wanted.min(item.quantity_grams);
                *wanted -= taken;
                taken
            }
            None => 0.0,
        };

        let left = item.quantity_grams - taken;
        if left > SHOPPING_EPSILON_GRAMS {
            remaining.push(PantryItem {
                quantity_grams: left,
                ..item.clone()
            });
        }
    }

    Ok(remaining)
}
