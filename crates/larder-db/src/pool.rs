use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/larder-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Every table larder owns, in dependency order.
pub const TABLES: [&str; 4] = ["users", "pantry_items", "meal_plans", "meal_entries"];

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Create a connection pool for the larder database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    Ok(pool)
}

/// Outcome of [`run_migrations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations applied by this run.
    pub applied: usize,
    /// Migrations embedded in the binary.
    pub embedded: usize,
}

async fn applied_migration_count(pool: &PgPool) -> Result<usize> {
    let has_ledger: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await
            .context("failed to look up the migration ledger")?;
    if !has_ledger {
        return Ok(0);
    }
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .context("failed to count applied migrations")?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Bring the larder schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<MigrationReport> {
    let before = applied_migration_count(pool).await?;
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    let after = applied_migration_count(pool).await?;

    let report = MigrationReport {
        applied: after.saturating_sub(before),
        embedded: MIGRATOR.iter().count(),
    };
    info!(
        applied = report.applied,
        embedded = report.embedded,
        "larder schema is current"
    );
    Ok(report)
}

/// Check that `name` can be used as a quoted database identifier.
pub fn validate_db_name(name: &str) -> Result<&str> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_BYTES {
        anyhow::bail!("database name {name:?} must be 1-{MAX_IDENTIFIER_BYTES} bytes long");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        anyhow::bail!("database name {name:?} may only contain letters, digits, '_' and '-'");
    }
    Ok(name)
}

/// Create the larder database when it is missing.
///
/// Goes through the `postgres` maintenance database on the same server.
/// Returns `true` when the database was created by this call.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    let db_name = validate_db_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&maintenance_url)
        .await
        .with_context(|| {
            format!("failed to connect to maintenance database at {maintenance_url}")
        })?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    let created = if exists {
        info!(db = db_name, "larder database already exists");
        false
    } else {
        // Quoted so mixed-case names survive; CREATE DATABASE takes no binds.
        let stmt = format!("CREATE DATABASE \"{db_name}\"");
        maint_pool
            .execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "larder database created");
        true
    };

    maint_pool.close().await;
    Ok(created)
}

/// Row counts of the larder tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct TableCounts {
    pub users: i64,
    pub pantry_items: i64,
    pub meal_plans: i64,
    pub meal_entries: i64,
}

impl TableCounts {
    /// `(table, rows)` pairs in [`TABLES`] order.
    pub fn rows(&self) -> [(&'static str, i64); 4] {
        [
            (TABLES[0], self.users),
            (TABLES[1], self.pantry_items),
            (TABLES[2], self.meal_plans),
            (TABLES[3], self.meal_entries),
        ]
    }
}

/// Count the rows of every larder table. Fails if the schema is missing.
pub async fn table_counts(pool: &PgPool) -> Result<TableCounts> {
    let columns: Vec<String> = TABLES
        .iter()
        .map(|table| format!("(SELECT COUNT(*) FROM {table}) AS {table}"))
        .collect();
    let query = format!("SELECT {}", columns.join(", "));
    sqlx::query_as::<_, TableCounts>(&query)
        .fetch_one(pool)
        .await
        .context("failed to count larder tables; has `larder db-init` been run?")
}
