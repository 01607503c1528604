//! Optional reference recipes fed into the prompt.
//!
//! A [`RecipeSource`] is advisory: the gateway logs its failures and plans
//! without references rather than aborting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::PlanRequest;

/// How many reference recipes the gateway asks for.
pub const DEFAULT_REFERENCE_COUNT: usize = 10;

/// Query used when the request carries neither preferences nor pantry.
pub const FALLBACK_QUERY: &str = "general meal planning";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Ranked lookup of candidate recipes for a free-text query.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ReferenceRecipe>>;
}

/// Free-text retrieval query built from preferences and pantry names.
pub fn retrieval_query(request: &PlanRequest) -> String {
    let mut parts = Vec::new();
    if !request.taste_preferences.is_empty() {
        parts.push(format!(
            "Preferences: {}",
            request.taste_preferences.join(", ")
        ));
    }
    if !request.pantry.is_empty() {
        let names: Vec<&str> = request.pantry.iter().map(|i| i.name.as_str()).collect();
        parts.push(format!("Available ingredients: {}", names.join(", ")));
    }
    if parts.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        parts.join("\n")
    }
}

/// A fixed in-memory list, returned in order regardless of the query.
#[derive(Debug, Clone, Default)]
pub struct StaticRecipes(pub Vec<ReferenceRecipe>);

#[async_trait]
impl RecipeSource for StaticRecipes {
    async fn retrieve(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<ReferenceRecipe>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}
