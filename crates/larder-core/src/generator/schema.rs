//! Validation of a recovered JSON object into a [`DayPlan`].
//!
//! The raw shapes below mirror what generators actually send: every field
//! is optional so a missing field yields a precise [`SchemaError`] instead
//! of a generic decode failure. Defaults resolved here:
//!
//! - `steps` absent: empty list.
//! - `quantity_grams` given as a numeric string: parsed as a number.
//! - `meal_type`: matched case-insensitively after trimming.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use larder_db::models::MealType;

use crate::model::{DayPlan, Ingredient, MAX_INGREDIENT_GRAMS, PlannedMeal};

/// Ways a generated day can fail validation. Meal and ingredient positions
/// are 1-based.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unexpected structure: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("missing required field `meals`")]
    MissingMeals,

    #[error("day contains no meals")]
    NoMeals,

    #[error("meal {meal} is missing required field `{field}`")]
    MissingMealField { meal: usize, field: &'static str },

    #[error("meal {meal} has invalid meal_type {value:?} (expected breakfast, lunch, dinner, or snack)")]
    InvalidMealType { meal: usize, value: String },

    #[error("meal {meal} ingredient {ingredient} is missing required field `{field}`")]
    MissingIngredientField {
        meal: usize,
        ingredient: usize,
        field: &'static str,
    },

    #[error("meal {meal} ingredient {name:?} has non-numeric quantity {value}")]
    NonNumericQuantity {
        meal: usize,
        name: String,
        value: Value,
    },

    #[error("meal {meal} ingredient {name:?} has quantity {value} g (must be > 0 and < {max} g)", max = MAX_INGREDIENT_GRAMS)]
    QuantityOutOfRange { meal: usize, name: String, value: f64 },
}

#[derive(Deserialize)]
struct RawDay {
    meals: Option<Vec<RawMeal>>,
}

#[derive(Deserialize)]
struct RawMeal {
    name: Option<String>,
    meal_type: Option<String>,
    ingredients: Option<Vec<RawIngredient>>,
    #[serde(default)]
    steps: Vec<String>,
}

#[derive(Deserialize)]
struct RawIngredient {
    name: Option<String>,
    quantity_grams: Option<Value>,
}

/// Validate `object` as one day of meals.
pub fn validate_day(object: Map<String, Value>) -> Result<DayPlan, SchemaError> {
    let raw: RawDay = serde_json::from_value(Value::Object(object))?;
    let raw_meals = raw.meals.ok_or(SchemaError::MissingMeals)?;
    if raw_meals.is_empty() {
        return Err(SchemaError::NoMeals);
    }

    let meals = raw_meals
        .into_iter()
        .enumerate()
        .map(|(i, meal)| validate_meal(i + 1, meal))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DayPlan { meals })
}

fn validate_meal(position: usize, raw: RawMeal) -> Result<PlannedMeal, SchemaError> {
    let missing = |field| SchemaError::MissingMealField {
        meal: position,
        field,
    };

    let name = non_blank(raw.name).ok_or_else(|| missing("name"))?;
    let meal_type_text = raw.meal_type.ok_or_else(|| missing("meal_type"))?;
    let meal_type = meal_type_text
        .trim()
        .to_lowercase()
        .parse::<MealType>()
        .map_err(|_| SchemaError::InvalidMealType {
            meal: position,
            value: meal_type_text.clone(),
        })?;
    let raw_ingredients = raw.ingredients.ok_or_else(|| missing("ingredients"))?;

    let ingredients = raw_ingredients
        .into_iter()
        .enumerate()
        .map(|(i, ingredient)| validate_ingredient(position, i + 1, ingredient))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlannedMeal {
        name,
        meal_type,
        ingredients,
        steps: raw.steps,
    })
}

fn validate_ingredient(
    meal: usize,
    position: usize,
    raw: RawIngredient,
) -> Result<Ingredient, SchemaError> {
    let missing = |field| SchemaError::MissingIngredientField {
        meal,
        ingredient: position,
        field,
    };

    let name = non_blank(raw.name).ok_or_else(|| missing("name"))?;
    let value = raw.quantity_grams.ok_or_else(|| missing("quantity_grams"))?;
    let quantity = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(quantity) = quantity else {
        return Err(SchemaError::NonNumericQuantity { meal, name, value });
    };

    if !(quantity > 0.0 && quantity < MAX_INGREDIENT_GRAMS) {
        return Err(SchemaError::QuantityOutOfRange {
            meal,
            name,
            value: quantity,
        });
    }

    Ok(Ingredient {
        name,
        quantity_grams: quantity,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
