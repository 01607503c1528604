//! Applying a confirmed plan to the live pantry.
//!
//! Confirmation is idempotent: the first call subtracts every planned meal
//! from the pantry, records the meals as history, and stamps the plan; any
//! later call returns the current pantry untouched. [`confirm_plan`] runs
//! all of that in one transaction with the plan row locked, so concurrent
//! confirmations of the same plan serialize and exactly one applies.

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use larder_db::queries::meal_entries::{self, NewMealEntry};
use larder_db::queries::pantry::{self as pantry_queries, NewPantryEntry};
use larder_db::queries::{meal_plans, users};

use crate::model::{MultiDayPlan, StoredPlan};
use crate::pantry::{PantryArithmeticError, PantryItem, consume, required_grams};

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("plan {plan_id} does not belong to user {user_id}")]
    NotOwner { plan_id: Uuid, user_id: Uuid },

    #[error("stored plan {plan_id} could not be decoded: {source}")]
    CorruptPlan {
        plan_id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    PantryArithmetic(#[from] PantryArithmeticError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of the pure confirmation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// The plan was confirmed earlier; the pantry is returned as given.
    AlreadyConfirmed(Vec<PantryItem>),
    /// The pantry after subtracting every meal in the plan.
    Applied(Vec<PantryItem>),
}

impl Confirmation {
    pub fn pantry(&self) -> &[PantryItem] {
        match self {
            Self::AlreadyConfirmed(pantry) | Self::Applied(pantry) => pantry,
        }
    }

    pub fn into_pantry(self) -> Vec<PantryItem> {
        match self {
            Self::AlreadyConfirmed(pantry) | Self::Applied(pantry) => pantry,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Subtract the whole plan from `current_pantry`.
///
/// Uses the same matching as daily depletion: normalized names, summed per
/// name, each subtraction clamped at zero, depleted items dropped.
/// Ingredients the pantry lacks are ignored.
pub fn confirm(
    plan: &StoredPlan,
    current_pantry: &[PantryItem],
) -> Result<Confirmation, PantryArithmeticError> {
    if plan.is_confirmed() {
        return Ok(Confirmation::AlreadyConfirmed(current_pantry.to_vec()));
    }
    let required = required_grams(plan.plan.days.iter().flat_map(|d| d.meals.iter()))?;
    Ok(Confirmation::Applied(consume(current_pantry, &required)?))
}

/// History rows for every meal in `plan`, with 1-based indices.
pub fn history_entries(plan: &MultiDayPlan) -> Result<Vec<NewMealEntry>, serde_json::Error> {
    plan.indexed_meals()
        .map(|(day_index, meal_index, meal)| -> Result<_, serde_json::Error> {
            Ok(NewMealEntry {
                day_index: day_index as i32,
                meal_index: meal_index as i32,
                name: meal.name.clone(),
                meal_type: meal.meal_type,
                meal_json: serde_json::to_value(meal)?,
            })
        })
        .collect()
}

/// What [`confirm_plan`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmReceipt {
    pub plan_id: Uuid,
    /// `false` when the plan had already been confirmed.
    pub applied: bool,
    pub meals_recorded: u64,
    pub pantry: Vec<PantryItem>,
}

/// Confirm `plan_id` on behalf of `user_id`, at most once.
pub async fn confirm_plan(
    pool: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<ConfirmReceipt, ConfirmError> {
    users::get_user(pool, user_id)
        .await?
        .ok_or(ConfirmError::UserNotFound(user_id))?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let row = meal_plans::lock_meal_plan(&mut *tx, plan_id)
        .await?
        .ok_or(ConfirmError::PlanNotFound(plan_id))?;
    if row.user_id != user_id {
        return Err(ConfirmError::NotOwner { plan_id, user_id });
    }
    let stored =
        StoredPlan::try_from(row).map_err(|source| ConfirmError::CorruptPlan { plan_id, source })?;

    let current: Vec<PantryItem> = pantry_queries::list_pantry_for_update(&mut *tx, user_id)
        .await?
        .into_iter()
        .map(PantryItem::from)
        .collect();

    let updated = match confirm(&stored, &current)? {
        Confirmation::AlreadyConfirmed(pantry) => {
            tx.commit().await.context("failed to commit transaction")?;
            info!(%plan_id, %user_id, "plan already confirmed, pantry unchanged");
            return Ok(ConfirmReceipt {
                plan_id,
                applied: false,
                meals_recorded: 0,
                pantry,
            });
        }
        Confirmation::Applied(pantry) => pantry,
    };

    let rows: Vec<NewPantryEntry<'_>> = updated
        .iter()
        .map(|item| NewPantryEntry {
            name: &item.name,
            quantity_grams: item.quantity_grams,
            flagged_for_use: item.flagged_for_use,
        })
        .collect();
    pantry_queries::replace_pantry(&mut *tx, user_id, &rows).await?;

    let entries = history_entries(&stored.plan).context("failed to encode meal history")?;
    let meals_recorded =
        meal_entries::insert_meal_entries(&mut *tx, user_id, plan_id, &entries).await?;

    let snapshot = serde_json::to_value(&updated).context("failed to encode pantry snapshot")?;
    if !meal_plans::mark_confirmed(&mut *tx, plan_id, Utc::now(), &snapshot).await? {
        // Unreachable while the row lock is held; rolled back on drop.
        return Err(anyhow!("plan {plan_id} was confirmed concurrently").into());
    }

    tx.commit().await.context("failed to commit confirmation")?;

    info!(
        %plan_id,
        %user_id,
        meals_recorded,
        pantry_items = updated.len(),
        "plan confirmed"
    );
    Ok(ConfirmReceipt {
        plan_id,
        applied: true,
        meals_recorded,
        pantry: updated,
    })
}
