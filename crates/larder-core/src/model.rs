//! Request and plan types shared by the planner, the gateway, and callers.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use larder_db::models::{MealPlan, MealType};

use crate::error::PlanError;
use crate::pantry::PantryItem;

/// Inclusive ceiling on ingredient quantity. Anything at or above this is
/// treated as a generator mistake.
pub const MAX_INGREDIENT_GRAMS: f64 = 10_000.0;

// ---------------------------------------------------------------------------
// Profile enums
// ---------------------------------------------------------------------------

macro_rules! string_enum {
    ($ty:ident, $err:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $(Self::$variant => $text,)+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!("invalid ", $err, ": {:?}"), other)),
                }
            }
        }
    };
}

/// Diet category requested for the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    Balanced,
    HighProtein,
    LowCarb,
    Vegetarian,
    Vegan,
}

string_enum!(DietType, "diet type", {
    Balanced => "balanced",
    HighProtein => "high_protein",
    LowCarb => "low_carb",
    Vegetarian => "vegetarian",
    Vegan => "vegan",
});

/// How quantities should be phrased in recipe steps. Ingredient quantities
/// are always grams regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementSystem {
    None,
    #[default]
    Metric,
    Imperial,
}

string_enum!(MeasurementSystem, "measurement system", {
    None => "none",
    Metric => "metric",
    Imperial => "imperial",
});

/// Whether the generator should stay with familiar dishes or experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variability {
    #[default]
    Traditional,
    Experimental,
}

string_enum!(Variability, "variability", {
    Traditional => "traditional",
    Experimental => "experimental",
});

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Constraints for a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRequest {
    /// Pantry snapshot at the start of the run.
    #[serde(alias = "stock_items")]
    pub pantry: Vec<PantryItem>,
    pub taste_preferences: Vec<String>,
    pub avoid_ingredients: Vec<String>,
    pub diet_type: Option<DietType>,
    pub meals_per_day: u32,
    pub people_count: u32,
    /// Names of meals already eaten or planned, oldest first.
    pub past_meals: Vec<String>,
    pub country: Option<String>,
    pub measurement_system: MeasurementSystem,
    pub variability: Variability,
    pub include_spices: bool,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            pantry: Vec::new(),
            taste_preferences: Vec::new(),
            avoid_ingredients: Vec::new(),
            diet_type: None,
            meals_per_day: 3,
            people_count: 2,
            past_meals: Vec::new(),
            country: None,
            measurement_system: MeasurementSystem::default(),
            variability: Variability::default(),
            include_spices: true,
        }
    }
}

impl PlanRequest {
    pub const MEALS_PER_DAY: RangeInclusive<u32> = 1..=6;
    pub const PEOPLE_COUNT: RangeInclusive<u32> = 1..=10;

    /// Reject out-of-range counts before any generator call is made.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !Self::MEALS_PER_DAY.contains(&self.meals_per_day) {
            return Err(PlanError::InvalidRequest(format!(
                "meals_per_day must be between {} and {}, got {}",
                Self::MEALS_PER_DAY.start(),
                Self::MEALS_PER_DAY.end(),
                self.meals_per_day
            )));
        }
        if !Self::PEOPLE_COUNT.contains(&self.people_count) {
            return Err(PlanError::InvalidRequest(format!(
                "people_count must be between {} and {}, got {}",
                Self::PEOPLE_COUNT.start(),
                Self::PEOPLE_COUNT.end(),
                self.people_count
            )));
        }
        if let Some(item) = self
            .pantry
            .iter()
            .find(|i| !i.quantity_grams.is_finite() || i.quantity_grams < 0.0)
        {
            return Err(PlanError::InvalidRequest(format!(
                "pantry item {:?} has invalid quantity {}",
                item.name, item.quantity_grams
            )));
        }
        Ok(())
    }

    /// Derived request for one day: same constraints, different pantry and
    /// meal history.
    pub fn for_day(&self, pantry: Vec<PantryItem>, past_meals: Vec<String>) -> Self {
        Self {
            pantry,
            past_meals,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity_grams: f64,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity_grams: f64) -> Self {
        Self {
            name: name.into(),
            quantity_grams,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub name: String,
    pub meal_type: MealType,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
}

/// Meals for one day, in serving order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub meals: Vec<PlannedMeal>,
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDayPlan {
    pub days: Vec<DayPlan>,
    pub shopping_list: Vec<Ingredient>,
}

impl MultiDayPlan {
    /// Every meal with its 1-based day and meal index.
    pub fn indexed_meals(&self) -> impl Iterator<Item = (u32, u32, &PlannedMeal)> + '_ {
        self.days.iter().zip(1u32..).flat_map(|(day, day_index)| {
            day.meals
                .iter()
                .zip(1u32..)
                .map(move |(meal, meal_index)| (day_index, meal_index, meal))
        })
    }

    pub fn meal_count(&self) -> usize {
        self.days.iter().map(|d| d.meals.len()).sum()
    }
}

/// A persisted plan decoded from its row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request: PlanRequest,
    pub plan: MultiDayPlan,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredPlan {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

impl TryFrom<MealPlan> for StoredPlan {
    type Error = serde_json::Error;

    fn try_from(row: MealPlan) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            request: serde_json::from_value(row.request_json)?,
            plan: serde_json::from_value(row.response_json)?,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_fill_missing_fields() {
        let request: PlanRequest =
            serde_json::from_str(r#"{"taste_preferences": ["spicy"]}"#).unwrap();
        assert_eq!(request.meals_per_day, 3);
        assert_eq!(request.people_count, 2);
        assert!(request.include_spices);
        assert_eq!(request.measurement_system, MeasurementSystem::Metric);
        assert_eq!(request.taste_preferences, vec!["spicy"]);
    }

    #[test]
    fn request_accepts_stock_items_alias() {
        let request: PlanRequest = serde_json::from_str(
            r#"{"stock_items": [{"name": "rice", "quantity_grams": 500, "need_to_use": true}]}"#,
        )
        .unwrap();
        assert_eq!(request.pantry.len(), 1);
        assert!(request.pantry[0].flagged_for_use);
    }

    #[test]
    fn validate_rejects_out_of_range_counts() {
        let request = PlanRequest {
            meals_per_day: 0,
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(PlanError::InvalidRequest(_))));

        let request = PlanRequest {
            people_count: 11,
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(PlanError::InvalidRequest(_))));

        assert!(PlanRequest::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_pantry() {
        let request = PlanRequest {
            pantry: vec![PantryItem::new("rice", -5.0)],
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(PlanError::InvalidRequest(_))));
    }

    #[test]
    fn for_day_keeps_constraints() {
        let request = PlanRequest {
            avoid_ingredients: vec!["peanuts".to_string()],
            pantry: vec![PantryItem::new("rice", 500.0)],
            ..Default::default()
        };
        let day = request.for_day(vec![], vec!["Curry".to_string()]);
        assert!(day.pantry.is_empty());
        assert_eq!(day.past_meals, vec!["Curry"]);
        assert_eq!(day.avoid_ingredients, vec!["peanuts"]);
        assert_eq!(request.pantry.len(), 1);
    }

    #[test]
    fn profile_enums_parse_leniently() {
        assert_eq!(" Imperial ".parse::<MeasurementSystem>(), Ok(MeasurementSystem::Imperial));
        assert_eq!("experimental".parse::<Variability>(), Ok(Variability::Experimental));
        assert_eq!("high_protein".parse::<DietType>(), Ok(DietType::HighProtein));
        assert!("furlongs".parse::<MeasurementSystem>().is_err());
        assert_eq!(DietType::LowCarb.to_string(), "low_carb");
    }

    #[test]
    fn indexed_meals_are_one_based() {
        let meal = |name: &str| PlannedMeal {
            name: name.to_string(),
            meal_type: MealType::Lunch,
            ingredients: vec![],
            steps: vec![],
        };
        let plan = MultiDayPlan {
            days: vec![
                DayPlan {
                    meals: vec![meal("a"), meal("b")],
                },
                DayPlan {
                    meals: vec![meal("c")],
                },
            ],
            shopping_list: vec![],
        };
        let indexed: Vec<(u32, u32, &str)> = plan
            .indexed_meals()
            .map(|(d, m, meal)| (d, m, meal.name.as_str()))
            .collect();
        assert_eq!(indexed, vec![(1, 1, "a"), (1, 2, "b"), (2, 1, "c")]);
        assert_eq!(plan.meal_count(), 3);
    }
}
