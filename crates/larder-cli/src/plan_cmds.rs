//! CLI handlers for `larder plan` subcommands and `larder history`.
//!
//! Implements:
//! - `larder plan create --user <id> --days <n> [--request <file>]`
//! - `larder plan show <user> <plan-id>`
//! - `larder plan list <user>`
//! - `larder plan confirm <user> <plan-id>`
//! - `larder plan shopping <user>`
//! - `larder history <user> [--limit <n>]`

use anyhow::{Context, Result};
use sqlx::PgPool;

use larder_core::confirm::confirm_plan;
use larder_core::generator::GeneratorSettings;
use larder_core::model::{Ingredient, PlanRequest, StoredPlan};
use larder_core::service;
use larder_db::queries::{meal_entries, users};

use crate::PlanCommands;
use crate::pantry_cmds::print_pantry;
use crate::user_cmds::parse_id;

// -----------------------------------------------------------------------
// Public entry points
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    generator: &GeneratorSettings,
) -> Result<()> {
    match command {
        PlanCommands::Create {
            user,
            days,
            request,
        } => cmd_create(pool, generator, &user, days, request.as_deref()).await,
        PlanCommands::Show { user, plan_id } => cmd_show(pool, &user, &plan_id).await,
        PlanCommands::List { user } => cmd_list(pool, &user).await,
        PlanCommands::Confirm { user, plan_id } => cmd_confirm(pool, &user, &plan_id).await,
        PlanCommands::Shopping { user } => cmd_shopping(pool, &user).await,
    }
}

/// `larder history`: meals recorded by confirmed plans, newest first.
pub async fn run_history(pool: &PgPool, raw_user: &str, limit: i64) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    users::get_user(pool, user_id)
        .await?
        .with_context(|| format!("user {user_id} not found"))?;

    let entries = meal_entries::list_meal_history(pool, user_id, limit.max(1)).await?;
    if entries.is_empty() {
        println!("No meals recorded yet. Confirm a plan to record its meals.");
        return Ok(());
    }

    println!("  {:<20} {:<10} {:>3} {:>3}  MEAL", "RECORDED", "TYPE", "DAY", "#");
    for entry in &entries {
        println!(
            "  {:<20} {:<10} {:>3} {:>3}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.meal_type,
            entry.day_index,
            entry.meal_index,
            entry.name
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan create
// -----------------------------------------------------------------------

fn read_request(file_path: Option<&str>) -> Result<PlanRequest> {
    let Some(file_path) = file_path else {
        return Ok(PlanRequest::default());
    };
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read request file: {file_path}"))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse request file: {file_path}"))
}

async fn cmd_create(
    pool: &PgPool,
    generator: &GeneratorSettings,
    raw_user: &str,
    days: u32,
    request_file: Option<&str>,
) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    let request = read_request(request_file)?;
    let gateway = generator.build_gateway()?;

    println!(
        "Planning {days} day(s) with {} ({})...",
        generator.provider,
        generator.model()
    );
    let stored = service::plan_for_user(pool, &gateway, user_id, request, days).await?;

    println!("Plan created.");
    println!();
    print_plan(&stored);
    println!();
    println!(
        "Confirm with `larder plan confirm {} {}` once you have cooked it.",
        user_id, stored.id
    );
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan show / list
// -----------------------------------------------------------------------

async fn cmd_show(pool: &PgPool, raw_user: &str, raw_plan: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    let plan_id = parse_id("plan", raw_plan)?;
    let stored = service::get_plan_for_user(pool, user_id, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found for user {user_id}"))?;
    print_plan(&stored);
    Ok(())
}

async fn cmd_list(pool: &PgPool, raw_user: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    let plans = service::list_plans_for_user(pool, user_id).await?;

    if plans.is_empty() {
        println!("No plans found.");
        return Ok(());
    }

    println!(
        "  {:<38} {:>4} {:>6} {:>9}  {:<20}",
        "PLAN ID", "DAYS", "MEALS", "SHOPPING", "STATUS"
    );
    for stored in &plans {
        let status = match stored.confirmed_at {
            Some(at) => format!("confirmed {}", at.format("%Y-%m-%d")),
            None => "pending".to_string(),
        };
        println!(
            "  {:<38} {:>4} {:>6} {:>9}  {:<20}",
            stored.id,
            stored.plan.days.len(),
            stored.plan.meal_count(),
            stored.plan.shopping_list.len(),
            status
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan confirm
// -----------------------------------------------------------------------

async fn cmd_confirm(pool: &PgPool, raw_user: &str, raw_plan: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    let plan_id = parse_id("plan", raw_plan)?;
    let receipt = confirm_plan(pool, user_id, plan_id).await?;

    if receipt.applied {
        println!(
            "Plan {plan_id} confirmed: {} meal(s) recorded.",
            receipt.meals_recorded
        );
    } else {
        println!("Plan {plan_id} was already confirmed; pantry unchanged.");
    }
    println!();
    if receipt.pantry.is_empty() {
        println!("Pantry is now empty.");
    } else {
        print_pantry(&receipt.pantry);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan shopping
// -----------------------------------------------------------------------

async fn cmd_shopping(pool: &PgPool, raw_user: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    users::get_user(pool, user_id)
        .await?
        .with_context(|| format!("user {user_id} not found"))?;

    let list = service::pending_shopping_list(pool, user_id).await?;
    if list.is_empty() {
        println!("Nothing to buy for pending plans.");
        return Ok(());
    }
    print_shopping_list(&list);
    Ok(())
}

// -----------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------

fn print_shopping_list(items: &[Ingredient]) {
    println!("Shopping list:");
    for item in items {
        println!("  - {} ({:.0} g)", item.name, item.quantity_grams);
    }
}

fn print_plan(stored: &StoredPlan) {
    println!("  Plan ID:   {}", stored.id);
    println!("  Created:   {}", stored.created_at.format("%Y-%m-%d %H:%M"));
    match stored.confirmed_at {
        Some(at) => println!("  Confirmed: {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("  Confirmed: no"),
    }

    for (day_number, day) in stored.plan.days.iter().enumerate() {
        println!();
        println!("Day {}:", day_number + 1);
        for meal in &day.meals {
            println!("  [{}] {}", meal.meal_type, meal.name);
            for ingredient in &meal.ingredients {
                println!(
                    "      - {} ({:.0} g)",
                    ingredient.name, ingredient.quantity_grams
                );
            }
        }
    }

    println!();
    if stored.plan.shopping_list.is_empty() {
        println!("Shopping list: nothing to buy.");
    } else {
        print_shopping_list(&stored.plan.shopping_list);
    }
}
