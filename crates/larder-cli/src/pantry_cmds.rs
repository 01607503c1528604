//! CLI handlers for `larder pantry` subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;

use larder_core::{PantryItem, service};
use larder_db::queries::users;

use crate::PantryCommands;
use crate::user_cmds::parse_id;

/// TOML pantry file layout: a list of `[[items]]` tables.
#[derive(Debug, Deserialize)]
struct PantryFile {
    #[serde(default)]
    items: Vec<PantryItem>,
}

/// Parse pantry file contents. `.toml` files use `[[items]]`; anything
/// else is read as a JSON array of items.
pub fn parse_pantry_file(path: &Path, contents: &str) -> Result<Vec<PantryItem>> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let file: PantryFile = toml::from_str(contents)
            .with_context(|| format!("failed to parse pantry TOML: {}", path.display()))?;
        Ok(file.items)
    } else {
        serde_json::from_str(contents)
            .with_context(|| format!("failed to parse pantry JSON: {}", path.display()))
    }
}

/// Dispatch a `PantryCommands` variant to the appropriate handler.
pub async fn run_pantry_command(command: PantryCommands, pool: &PgPool) -> Result<()> {
    match command {
        PantryCommands::Show { user } => cmd_show(pool, &user).await,
        PantryCommands::Set { user, file } => cmd_set(pool, &user, &file).await,
    }
}

async fn cmd_show(pool: &PgPool, raw_user: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    users::get_user(pool, user_id)
        .await?
        .with_context(|| format!("user {user_id} not found"))?;

    let pantry = service::load_pantry(pool, user_id).await?;
    if pantry.is_empty() {
        println!("Pantry is empty.");
        return Ok(());
    }
    print_pantry(&pantry);
    Ok(())
}

async fn cmd_set(pool: &PgPool, raw_user: &str, file_path: &str) -> Result<()> {
    let user_id = parse_id("user", raw_user)?;
    users::get_user(pool, user_id)
        .await?
        .with_context(|| format!("user {user_id} not found"))?;

    let path = Path::new(file_path);
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pantry file: {file_path}"))?;
    let items = parse_pantry_file(path, &contents)?;

    let stored = service::save_pantry(pool, user_id, &items).await?;
    let dropped = items.len() - stored.len();

    println!("Pantry replaced: {} item(s) stored.", stored.len());
    if dropped > 0 {
        println!("  ({dropped} item(s) without stock or name were dropped)");
    }
    println!();
    print_pantry(&stored);
    Ok(())
}

pub fn print_pantry(pantry: &[PantryItem]) {
    println!("  {:<32} {:>10}  USE SOON", "NAME", "GRAMS");
    for item in pantry {
        println!(
            "  {:<32} {:>10.1}  {}",
            item.name,
            item.quantity_grams,
            if item.flagged_for_use { "yes" } else { "" }
        );
    }
}
