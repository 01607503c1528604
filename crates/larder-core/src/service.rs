//! Planning service: the persistence-aware entry points used by the CLI and
//! the HTTP API.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use larder_db::models::User;
use larder_db::queries::pantry::{self as pantry_queries, NewPantryEntry};
use larder_db::queries::{meal_plans, users};

use crate::error::PlanError;
use crate::model::{Ingredient, PlanRequest, StoredPlan};
use crate::pantry::{PantryItem, merge_shopping_lists};
use crate::planner::{DayGenerator, plan};

/// Overwrite the profile-owned fields of `request` with the user's stored
/// settings. Unrecognized stored values fall back to the defaults.
pub fn apply_profile(request: PlanRequest, user: &User) -> PlanRequest {
    PlanRequest {
        country: user.country.clone(),
        measurement_system: user.measurement_system.parse().unwrap_or_default(),
        variability: user.variability.parse().unwrap_or_default(),
        include_spices: user.include_spices,
        ..request
    }
}

pub async fn load_pantry(pool: &PgPool, user_id: Uuid) -> Result<Vec<PantryItem>> {
    let rows = pantry_queries::list_pantry(pool, user_id).await?;
    Ok(rows.into_iter().map(PantryItem::from).collect())
}

/// Replace the user's pantry. Items with no stock are dropped.
pub async fn save_pantry(
    pool: &PgPool,
    user_id: Uuid,
    items: &[PantryItem],
) -> Result<Vec<PantryItem>> {
    if let Some(bad) = items.iter().find(|i| !i.quantity_grams.is_finite()) {
        anyhow::bail!("pantry item {:?} has non-finite quantity", bad.name);
    }
    let rows: Vec<NewPantryEntry<'_>> = items
        .iter()
        .map(|item| NewPantryEntry {
            name: item.name.trim(),
            quantity_grams: item.quantity_grams,
            flagged_for_use: item.flagged_for_use,
        })
        .filter(|row| !row.name.is_empty())
        .collect();
    let stored = pantry_queries::replace_pantry_in_pool(pool, user_id, &rows).await?;
    Ok(stored.into_iter().map(PantryItem::from).collect())
}

/// Plan `days` days for `user_id` from the live pantry and store the result.
///
/// The pantry in `request` is ignored; the stored pantry is used instead.
/// Nothing is stored unless every day generates successfully.
pub async fn plan_for_user<G>(
    pool: &PgPool,
    generator: &G,
    user_id: Uuid,
    request: PlanRequest,
    days: u32,
) -> Result<StoredPlan, PlanError>
where
    G: DayGenerator + ?Sized,
{
    let user = users::get_user(pool, user_id)
        .await?
        .ok_or(PlanError::UserNotFound(user_id))?;

    let pantry = load_pantry(pool, user_id).await?;
    let request = PlanRequest {
        pantry,
        ..apply_profile(request, &user)
    };

    let result = plan(generator, &request, days).await?;

    let request_json = serde_json::to_value(&request).context("failed to encode plan request")?;
    let response_json = serde_json::to_value(&result).context("failed to encode plan")?;
    let row = meal_plans::insert_meal_plan(
        pool,
        &meal_plans::NewMealPlan {
            user_id,
            days: days as i32,
            meals_per_day: request.meals_per_day as i32,
            people_count: request.people_count as i32,
            request_json: &request_json,
            response_json: &response_json,
        },
    )
    .await?;

    info!(
        plan_id = %row.id,
        %user_id,
        days,
        meals = result.meal_count(),
        shopping_items = result.shopping_list.len(),
        "plan stored"
    );

    Ok(StoredPlan {
        id: row.id,
        user_id,
        request,
        plan: result,
        confirmed_at: row.confirmed_at,
        created_at: row.created_at,
    })
}

/// Fetch a plan if it exists and belongs to `user_id`.
pub async fn get_plan_for_user(
    pool: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<Option<StoredPlan>> {
    let Some(row) = meal_plans::get_meal_plan(pool, plan_id).await? else {
        return Ok(None);
    };
    if row.user_id != user_id {
        return Ok(None);
    }
    let stored = StoredPlan::try_from(row)
        .with_context(|| format!("stored plan {plan_id} could not be decoded"))?;
    Ok(Some(stored))
}

/// All of a user's plans, newest first.
pub async fn list_plans_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<StoredPlan>> {
    meal_plans::list_meal_plans(pool, user_id)
        .await?
        .into_iter()
        .map(|row| {
            let id = row.id;
            StoredPlan::try_from(row)
                .with_context(|| format!("stored plan {id} could not be decoded"))
        })
        .collect()
}

/// One shopping list covering every plan the user has not confirmed yet.
///
/// Each plan's list was computed against the pantry at planning time, so
/// overlapping pending plans may ask for the same stock twice.
pub async fn pending_shopping_list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Ingredient>> {
    let pending: Vec<Ingredient> = list_plans_for_user(pool, user_id)
        .await?
        .into_iter()
        .filter(|stored| !stored.is_confirmed())
        .rev()
        .flat_map(|stored| stored.plan.shopping_list)
        .collect();
    Ok(merge_shopping_lists(&pending))
}
