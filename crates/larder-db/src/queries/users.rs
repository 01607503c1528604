//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Profile fields that may be changed after a user is created. `None`
/// leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate<'a> {
    pub country: Option<&'a str>,
    pub measurement_system: Option<&'a str>,
    pub variability: Option<&'a str>,
    pub include_spices: Option<bool>,
}

/// Insert a new user with default profile settings.
///
/// Returns `None` when the email is already taken, including when a
/// concurrent insert wins the race.
pub async fn insert_user(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email) VALUES ($1) \
         ON CONFLICT (email) DO NOTHING \
         RETURNING *",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert user {email:?}"))?;

    Ok(user)
}

/// Fetch a user by ID.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Fetch a user by email address.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by email")?;

    Ok(user)
}

/// Apply a partial profile update. Returns `None` if the user does not exist.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate<'_>,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET \
             country = COALESCE($2, country), \
             measurement_system = COALESCE($3, measurement_system), \
             variability = COALESCE($4, variability), \
             include_spices = COALESCE($5, include_spices) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(update.country)
    .bind(update.measurement_system)
    .bind(update.variability)
    .bind(update.include_spices)
    .fetch_optional(pool)
    .await
    .context("failed to update user profile")?;

    Ok(user)
}
