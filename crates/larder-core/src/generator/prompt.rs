//! Prompt construction for single-day generation.
//!
//! The gateway only depends on [`PromptRenderer`]; [`MealPlanPrompt`] is the
//! built-in renderer. Rendering is pure string assembly.

use crate::model::{MAX_INGREDIENT_GRAMS, MeasurementSystem, PlanRequest, Variability};

use super::references::ReferenceRecipe;

/// System prompt sent with every day request.
pub const SYSTEM_PROMPT: &str =
    "You are a careful and realistic meal planner. ALWAYS return ONLY valid JSON.";

/// Renders the user prompt for one day.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, request: &PlanRequest, references: &[ReferenceRecipe]) -> String;
}

/// Plain-text renderer covering every request field.
#[derive(Debug, Clone, Copy, Default)]
pub struct MealPlanPrompt;

impl PromptRenderer for MealPlanPrompt {
    fn render(&self, request: &PlanRequest, references: &[ReferenceRecipe]) -> String {
        let mut prompt = String::with_capacity(2048);

        prompt.push_str(&format!(
            "Plan {} meal(s) for ONE day for {} people.\n",
            request.meals_per_day, request.people_count
        ));
        if let Some(diet) = request.diet_type {
            prompt.push_str(&format!("Diet: {}.\n", diet.to_string().replace('_', " ")));
        }
        if let Some(country) = request.country.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!(
                "Prefer dishes and ingredients commonly available in {}.\n",
                country.trim()
            ));
        }
        prompt.push_str(match request.variability {
            Variability::Traditional => "Stick to familiar, traditional dishes.\n",
            Variability::Experimental => {
                "Feel free to suggest unusual dishes and combinations.\n"
            }
        });
        prompt.push_str(match request.measurement_system {
            MeasurementSystem::Metric => "Use metric units in recipe steps.\n",
            MeasurementSystem::Imperial => "Use imperial units in recipe steps.\n",
            MeasurementSystem::None => "Do not mention quantities in recipe steps.\n",
        });
        if request.include_spices {
            prompt.push_str("List spices and seasonings as ingredients with gram quantities.\n");
        } else {
            prompt.push_str("Do not list spices, salt, or pepper as ingredients.\n");
        }

        // Pantry
        prompt.push('\n');
        if request.pantry.is_empty() {
            prompt.push_str("The pantry is empty; every ingredient will be bought.\n");
        } else {
            prompt.push_str("Pantry (prefer these; items marked USE SOON come first):\n");
            for item in &request.pantry {
                prompt.push_str(&format!(
                    "- {}: {} g{}\n",
                    item.name,
                    format_grams(item.quantity_grams),
                    if item.flagged_for_use { " (USE SOON)" } else { "" }
                ));
            }
        }

        if !request.avoid_ingredients.is_empty() {
            prompt.push_str(&format!(
                "\nNEVER use these ingredients or anything made from them, even if they are in the pantry: {}.\n",
                request.avoid_ingredients.join(", ")
            ));
        }
        if !request.taste_preferences.is_empty() {
            prompt.push_str(&format!(
                "\nTaste preferences: {}.\n",
                request.taste_preferences.join(", ")
            ));
        }
        if !request.past_meals.is_empty() {
            prompt.push_str(&format!(
                "\nDo not repeat these meals: {}.\n",
                request.past_meals.join("; ")
            ));
        }

        if !references.is_empty() {
            prompt.push_str("\nReference recipes (inspiration only, adapt freely):\n");
            for (i, recipe) in references.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, recipe.title));
                if !recipe.ingredients.is_empty() {
                    prompt.push_str(&format!(
                        "   Ingredients: {}\n",
                        recipe.ingredients.join("; ")
                    ));
                }
            }
        }

        prompt.push_str(&output_format_section());
        prompt
    }
}

fn output_format_section() -> String {
    format!(
        r#"
Respond with a single JSON object of exactly this shape:
{{
  "meals": [
    {{
      "name": "dish name",
      "meal_type": "breakfast" | "lunch" | "dinner" | "snack",
      "ingredients": [{{"name": "ingredient", "quantity_grams": 150}}],
      "steps": ["step one", "step two"]
    }}
  ]
}}
Quantities are grams for the whole household, greater than 0 and below {}.
Use the pantry's ingredient names exactly where you use pantry items.
"#,
        MAX_INGREDIENT_GRAMS
    )
}

/// Whole grams without a decimal point, otherwise one decimal place.
fn format_grams(grams: f64) -> String {
    if grams.fract() == 0.0 {
        format!("{grams:.0}")
    } else {
        format!("{grams:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DietType;
    use crate::pantry::PantryItem;

    fn render(request: &PlanRequest) -> String {
        MealPlanPrompt.render(request, &[])
    }

    #[test]
    fn includes_counts_and_pantry() {
        let request = PlanRequest {
            meals_per_day: 2,
            people_count: 4,
            pantry: vec![
                PantryItem::new("rice", 500.0),
                PantryItem::new("spinach", 120.5).flagged(),
            ],
            ..Default::default()
        };
        let prompt = render(&request);
        assert!(prompt.contains("Plan 2 meal(s) for ONE day for 4 people."));
        assert!(prompt.contains("- rice: 500 g\n"));
        assert!(prompt.contains("- spinach: 120.5 g (USE SOON)\n"));
    }

    #[test]
    fn empty_pantry_is_stated() {
        assert!(render(&PlanRequest::default()).contains("The pantry is empty"));
    }

    #[test]
    fn avoid_list_wins_over_pantry() {
        let request = PlanRequest {
            pantry: vec![PantryItem::new("peanuts", 200.0).flagged()],
            avoid_ingredients: vec!["peanuts".into(), "shellfish".into()],
            ..Default::default()
        };
        let prompt = render(&request);
        assert!(prompt.contains("NEVER use these ingredients"));
        assert!(prompt.contains("even if they are in the pantry: peanuts, shellfish."));
    }

    #[test]
    fn profile_settings_are_rendered() {
        let request = PlanRequest {
            diet_type: Some(DietType::HighProtein),
            country: Some("Czechia".into()),
            measurement_system: MeasurementSystem::Imperial,
            variability: Variability::Experimental,
            include_spices: false,
            ..Default::default()
        };
        let prompt = render(&request);
        assert!(prompt.contains("Diet: high protein."));
        assert!(prompt.contains("commonly available in Czechia"));
        assert!(prompt.contains("imperial units"));
        assert!(prompt.contains("unusual dishes"));
        assert!(prompt.contains("Do not list spices"));
    }

    #[test]
    fn past_meals_and_references_listed() {
        let request = PlanRequest {
            past_meals: vec!["Goulash".into(), "Pancakes".into()],
            ..Default::default()
        };
        let references = vec![ReferenceRecipe {
            title: "Fried rice".into(),
            ingredients: vec!["rice".into(), "egg".into()],
            steps: vec![],
        }];
        let prompt = MealPlanPrompt.render(&request, &references);
        assert!(prompt.contains("Do not repeat these meals: Goulash; Pancakes."));
        assert!(prompt.contains("1. Fried rice\n   Ingredients: rice; egg\n"));
    }

    #[test]
    fn output_section_names_schema_fields() {
        let prompt = render(&PlanRequest::default());
        assert!(prompt.contains("\"meal_type\""));
        assert!(prompt.contains("\"quantity_grams\""));
        assert!(prompt.contains("below 10000"));
    }
}
