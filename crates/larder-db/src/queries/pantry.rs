//! Database query functions for the `pantry_items` table.
//!
//! The pantry is always written wholesale: [`replace_pantry`] deletes the
//! user's rows and inserts the new list in order.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::PantryEntry;

/// A pantry line to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewPantryEntry<'a> {
    pub name: &'a str,
    pub quantity_grams: f64,
    pub flagged_for_use: bool,
}

/// List a user's pantry in entry order.
pub async fn list_pantry<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<PantryEntry>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, PantryEntry>(
        "SELECT * FROM pantry_items WHERE user_id = $1 ORDER BY position, id",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .context("failed to list pantry items")?;

    Ok(rows)
}

/// List a user's pantry, locking the rows until the enclosing transaction
/// ends.
pub async fn list_pantry_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<PantryEntry>> {
    let rows = sqlx::query_as::<_, PantryEntry>(
        "SELECT * FROM pantry_items WHERE user_id = $1 ORDER BY position, id FOR UPDATE",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
    .context("failed to lock pantry items")?;

    Ok(rows)
}

/// Replace a user's pantry with `items`.
///
/// Entries whose quantity is not strictly positive are skipped; the pantry
/// never stores zero or negative stock. Run inside a transaction so readers
/// never observe the intermediate empty pantry.
pub async fn replace_pantry(
    conn: &mut PgConnection,
    user_id: Uuid,
    items: &[NewPantryEntry<'_>],
) -> Result<Vec<PantryEntry>> {
    sqlx::query("DELETE FROM pantry_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .context("failed to clear pantry items")?;

    let mut stored = Vec::with_capacity(items.len());
    let mut position = 0i32;
    for item in items.iter().filter(|i| i.quantity_grams > 0.0) {
        let row = sqlx::query_as::<_, PantryEntry>(
            "INSERT INTO pantry_items (user_id, position, name, quantity_grams, flagged_for_use) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(position)
        .bind(item.name)
        .bind(item.quantity_grams)
        .bind(item.flagged_for_use)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to insert pantry item {:?}", item.name))?;

        stored.push(row);
        position += 1;
    }

    Ok(stored)
}

/// Replace a user's pantry in its own transaction.
pub async fn replace_pantry_in_pool(
    pool: &PgPool,
    user_id: Uuid,
    items: &[NewPantryEntry<'_>],
) -> Result<Vec<PantryEntry>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let stored = replace_pantry(&mut *tx, user_id, items).await?;
    tx.commit().await.context("failed to commit transaction")?;
    Ok(stored)
}
