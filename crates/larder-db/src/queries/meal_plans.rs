//! Database query functions for the `meal_plans` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::MealPlan;

/// Column values for a freshly generated plan.
#[derive(Debug, Clone)]
pub struct NewMealPlan<'a> {
    pub user_id: Uuid,
    pub days: i32,
    pub meals_per_day: i32,
    pub people_count: i32,
    pub request_json: &'a JsonValue,
    pub response_json: &'a JsonValue,
}

/// Insert a new plan row. Returns the stored plan with server-generated
/// defaults (id, created_at).
pub async fn insert_meal_plan(pool: &PgPool, plan: &NewMealPlan<'_>) -> Result<MealPlan> {
    let row = sqlx::query_as::<_, MealPlan>(
        "INSERT INTO meal_plans (user_id, days, meals_per_day, people_count, request_json, response_json) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(plan.user_id)
    .bind(plan.days)
    .bind(plan.meals_per_day)
    .bind(plan.people_count)
    .bind(plan.request_json)
    .bind(plan.response_json)
    .fetch_one(pool)
    .await
    .context("failed to insert meal plan")?;

    Ok(row)
}

/// Fetch a plan by its ID.
pub async fn get_meal_plan(pool: &PgPool, id: Uuid) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch meal plan")?;

    Ok(plan)
}

/// Fetch a plan and take a row lock on it for the rest of the transaction.
///
/// A second transaction asking for the same plan blocks here until the
/// first one commits or rolls back.
pub async fn lock_meal_plan(conn: &mut PgConnection, id: Uuid) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to lock meal plan")?;

    Ok(plan)
}

/// List a user's plans, newest first.
pub async fn list_meal_plans(pool: &PgPool, user_id: Uuid) -> Result<Vec<MealPlan>> {
    let plans = sqlx::query_as::<_, MealPlan>(
        "SELECT * FROM meal_plans WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list meal plans")?;

    Ok(plans)
}

/// Set the confirmation timestamp and the post-confirmation pantry snapshot.
///
/// Only succeeds while `confirmed_at` is still unset, so the timestamp is
/// written at most once. Returns `false` if the plan was already confirmed.
pub async fn mark_confirmed(
    conn: &mut PgConnection,
    id: Uuid,
    confirmed_at: DateTime<Utc>,
    pantry_after: &JsonValue,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE meal_plans \
         SET confirmed_at = $2, pantry_after_json = $3 \
         WHERE id = $1 AND confirmed_at IS NULL",
    )
    .bind(id)
    .bind(confirmed_at)
    .bind(pantry_after)
    .execute(&mut *conn)
    .await
    .context("failed to mark meal plan confirmed")?;

    Ok(result.rows_affected() == 1)
}
