//! CLI handlers for `larder user` subcommands, plus the profile update
//! type shared with the HTTP API.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use larder_core::model::{MeasurementSystem, Variability};
use larder_db::models::User;
use larder_db::queries::users::{self, ProfileUpdate};

use crate::UserCommands;

/// Validated profile changes. Unset fields are left as stored.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileChanges {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub measurement_system: Option<MeasurementSystem>,
    #[serde(default)]
    pub variability: Option<Variability>,
    #[serde(default)]
    pub include_spices: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Store the changes. Returns `None` if the user does not exist.
    pub async fn apply(&self, pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
        let measurement_system = self.measurement_system.map(|m| m.to_string());
        let variability = self.variability.map(|v| v.to_string());
        let country = self.country.as_deref().map(str::trim);
        users::update_profile(
            pool,
            user_id,
            &ProfileUpdate {
                country,
                measurement_system: measurement_system.as_deref(),
                variability: variability.as_deref(),
                include_spices: self.include_spices,
            },
        )
        .await
    }
}

pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {kind} ID: {raw}"))
}

/// Dispatch a `UserCommands` variant to the appropriate handler.
pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add { email } => cmd_add(pool, &email).await,
        UserCommands::Show { user } => cmd_show(pool, &user).await,
        UserCommands::Update {
            user,
            country,
            measurement_system,
            variability,
            include_spices,
        } => {
            let changes = ProfileChanges {
                country,
                measurement_system,
                variability,
                include_spices,
            };
            cmd_update(pool, &user, &changes).await
        }
    }
}

async fn cmd_add(pool: &PgPool, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        anyhow::bail!("email must not be empty");
    }
    let user = users::insert_user(pool, email)
        .await?
        .with_context(|| format!("a user with email {email:?} already exists"))?;

    println!("User created.");
    println!();
    print_user(&user);
    Ok(())
}

async fn cmd_show(pool: &PgPool, raw_id: &str) -> Result<()> {
    let id = parse_id("user", raw_id)?;
    let user = users::get_user(pool, id)
        .await?
        .with_context(|| format!("user {id} not found"))?;
    print_user(&user);
    Ok(())
}

async fn cmd_update(pool: &PgPool, raw_id: &str, changes: &ProfileChanges) -> Result<()> {
    let id = parse_id("user", raw_id)?;
    if changes.is_empty() {
        anyhow::bail!(
            "nothing to update; pass --country, --measurement-system, --variability, or --include-spices"
        );
    }
    let user = changes
        .apply(pool, id)
        .await?
        .with_context(|| format!("user {id} not found"))?;

    println!("Profile updated.");
    println!();
    print_user(&user);
    Ok(())
}

fn print_user(user: &User) {
    println!("  User ID:            {}", user.id);
    println!("  Email:              {}", user.email);
    println!(
        "  Country:            {}",
        user.country.as_deref().unwrap_or("-")
    );
    println!("  Measurement system: {}", user.measurement_system);
    println!("  Variability:        {}", user.variability);
    println!("  Include spices:     {}", user.include_spices);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_changes_parse_from_json() {
        let changes: ProfileChanges =
            serde_json::from_str(r#"{"measurement_system": "imperial", "include_spices": false}"#)
                .unwrap();
        assert_eq!(changes.measurement_system, Some(MeasurementSystem::Imperial));
        assert_eq!(changes.include_spices, Some(false));
        assert!(changes.country.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn profile_changes_reject_unknown_values() {
        assert!(serde_json::from_str::<ProfileChanges>(r#"{"variability": "wild"}"#).is_err());
        assert!(serde_json::from_str::<ProfileChanges>(r#"{"colour": "red"}"#).is_err());
    }

    #[test]
    fn empty_changes_are_detected() {
        let changes: ProfileChanges = serde_json::from_str("{}").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn parse_id_reports_kind() {
        let err = parse_id("plan", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("invalid plan ID"));
    }
}
