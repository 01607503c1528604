//! Offline backend: a fixed canned day, no network.
//!
//! Used for local development and tests that exercise the full pipeline
//! (normalize, validate, deplete) without a model.

use async_trait::async_trait;

use super::backend::{BackendError, GenerativeBackend};

/// The day every offline completion returns.
pub const CANNED_DAY: &str = r#"{
  "meals": [
    {
      "name": "Mock spicy chicken with rice",
      "meal_type": "lunch",
      "ingredients": [
        {"name": "chicken breast", "quantity_grams": 200},
        {"name": "rice", "quantity_grams": 100},
        {"name": "garlic", "quantity_grams": 20},
        {"name": "soy sauce", "quantity_grams": 25}
      ],
      "steps": [
        "Cook the rice.",
        "Stir-fry the chicken with garlic.",
        "Add soy sauce and serve over rice."
      ]
    }
  ]
}"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl GenerativeBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn model(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, BackendError> {
        Ok(CANNED_DAY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{normalize::normalize, schema::validate_day};

    #[tokio::test]
    async fn canned_day_passes_validation() {
        let text = OfflineBackend.complete("sys", "usr").await.unwrap();
        let day = validate_day(normalize(&text).unwrap()).unwrap();
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.meals[0].name, "Mock spicy chicken with rice");
        assert_eq!(day.meals[0].ingredients.len(), 4);
    }
}
