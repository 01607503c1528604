//! Database query functions for the `meal_entries` table (meal history).

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{MealEntry, MealType};

/// A history row to be written when a plan is confirmed.
#[derive(Debug, Clone)]
pub struct NewMealEntry {
    /// 1-based day of the plan.
    pub day_index: i32,
    /// 1-based position within the day.
    pub meal_index: i32,
    pub name: String,
    pub meal_type: MealType,
    pub meal_json: JsonValue,
}

/// Insert one history row per entry.
pub async fn insert_meal_entries(
    conn: &mut PgConnection,
    user_id: Uuid,
    meal_plan_id: Uuid,
    entries: &[NewMealEntry],
) -> Result<u64> {
    let mut inserted = 0u64;
    for entry in entries {
        let result = sqlx::query(
            "INSERT INTO meal_entries \
                 (user_id, meal_plan_id, day_index, meal_index, name, meal_type, meal_json) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user_id)
        .bind(meal_plan_id)
        .bind(entry.day_index)
        .bind(entry.meal_index)
        .bind(&entry.name)
        .bind(entry.meal_type)
        .bind(&entry.meal_json)
        .execute(&mut *conn)
        .await
        .with_context(|| {
            format!(
                "failed to insert meal entry day {} meal {}",
                entry.day_index, entry.meal_index
            )
        })?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// List a user's meal history, newest plan first, meals in plan order.
pub async fn list_meal_history(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<MealEntry>> {
    let entries = sqlx::query_as::<_, MealEntry>(
        "SELECT * FROM meal_entries \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, day_index, meal_index \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list meal history")?;

    Ok(entries)
}

/// All history rows written for one plan, in plan order.
pub async fn list_entries_for_plan(pool: &PgPool, meal_plan_id: Uuid) -> Result<Vec<MealEntry>> {
    let entries = sqlx::query_as::<_, MealEntry>(
        "SELECT * FROM meal_entries WHERE meal_plan_id = $1 ORDER BY day_index, meal_index",
    )
    .bind(meal_plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list meal entries for plan")?;

    Ok(entries)
}
