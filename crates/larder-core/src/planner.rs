//! Multi-day orchestration.
//!
//! Days are generated strictly in sequence: day *n+1* sees the pantry left
//! after day *n* and every meal name planned so far. The shopping list is
//! computed once at the end, against the pantry as it was before day one.
//! Any failure abandons the whole run.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::PlanError;
use crate::model::{DayPlan, MultiDayPlan, PlanRequest};
use crate::pantry::{deplete, shopping_list};

/// Number of days a single run may cover.
pub const PLAN_DAYS: RangeInclusive<u32> = 1..=14;

/// Produces one validated day for a request.
#[async_trait]
pub trait DayGenerator: Send + Sync {
    async fn generate_day(&self, request: &PlanRequest) -> Result<DayPlan, PlanError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn DayGenerator) {}
};

/// Plan `days` consecutive days from `request`.
///
/// `request` itself is never modified; each day gets a derived request
/// carrying the running pantry and meal history.
pub async fn plan<G>(
    generator: &G,
    request: &PlanRequest,
    days: u32,
) -> Result<MultiDayPlan, PlanError>
where
    G: DayGenerator + ?Sized,
{
    if !PLAN_DAYS.contains(&days) {
        return Err(PlanError::InvalidRequest(format!(
            "days must be between {} and {}, got {days}",
            PLAN_DAYS.start(),
            PLAN_DAYS.end()
        )));
    }
    request.validate()?;

    let mut pantry = request.pantry.clone();
    let mut history = request.past_meals.clone();
    let mut planned = Vec::with_capacity(days as usize);

    for day in 1..=days {
        let day_request = request.for_day(pantry.clone(), history.clone());
        let day_plan = generator
            .generate_day(&day_request)
            .await
            .inspect_err(|e| warn!(day, days, error = %e, "day generation failed, abandoning run"))?;

        pantry = deplete(&pantry, &day_plan.meals)?;
        history.extend(day_plan.meals.iter().map(|m| m.name.clone()));
        info!(
            day,
            days,
            meals = day_plan.meals.len(),
            pantry_items = pantry.len(),
            "day planned"
        );
        planned.push(day_plan);
    }

    let shopping = shopping_list(&planned, &request.pantry)?;
    info!(days, shopping_items = shopping.len(), "plan complete");
    Ok(MultiDayPlan {
        days: planned,
        shopping_list: shopping,
    })
}
