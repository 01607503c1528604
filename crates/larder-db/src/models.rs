use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Slot a planned meal occupies within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// All variants, in the order they occur during a day.
    pub const ALL: [MealType; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        };
        f.write_str(s)
    }
}

impl FromStr for MealType {
    type Err = MealTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            other => Err(MealTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealType`] string.
#[derive(Debug, Clone)]
pub struct MealTypeParseError(pub String);

impl fmt::Display for MealTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid meal type: {:?}", self.0)
    }
}

impl std::error::Error for MealTypeParseError {}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A household account. Profile columns are free text; callers decide how
/// to interpret unrecognized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub country: Option<String>,
    pub measurement_system: String,
    pub variability: String,
    pub include_spices: bool,
    pub created_at: DateTime<Utc>,
}

/// One stored pantry line. `position` preserves the order the household
/// entered items in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PantryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub position: i32,
    pub name: String,
    pub quantity_grams: f64,
    pub flagged_for_use: bool,
    pub updated_at: DateTime<Utc>,
}

/// A generated multi-day plan. Request and result are kept verbatim as
/// JSON so confirmation can replay exactly what was shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub days: i32,
    pub meals_per_day: i32,
    pub people_count: i32,
    pub request_json: JsonValue,
    pub response_json: JsonValue,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub pantry_after_json: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// A meal recorded as eaten when its plan was confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MealEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_plan_id: Uuid,
    pub day_index: i32,
    pub meal_index: i32,
    pub name: String,
    pub meal_type: MealType,
    pub meal_json: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_type_round_trips_through_strings() {
        for meal_type in MealType::ALL {
            let parsed: MealType = meal_type.to_string().parse().unwrap();
            assert_eq!(parsed, meal_type);
        }
    }

    #[test]
    fn meal_type_rejects_unknown() {
        let err = "brunch".parse::<MealType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid meal type: \"brunch\"");
    }

    #[test]
    fn meal_type_serde_is_snake_case() {
        let json = serde_json::to_string(&MealType::Dinner).unwrap();
        assert_eq!(json, "\"dinner\"");
    }
}
