mod config;
mod pantry_cmds;
mod plan_cmds;
mod serve_cmd;
mod user_cmds;

use clap::{Parser, Subcommand};

use larder_core::generator::Provider;
use larder_core::model::{MeasurementSystem, Variability};
use larder_db::pool;

use config::LarderConfig;

#[derive(Parser)]
#[command(name = "larder", about = "Multi-day household meal planner")]
struct Cli {
    /// Database URL (overrides LARDER_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Use the canned offline generator instead of a hosted model
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a larder config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/larder")]
        db_url: String,
        /// Generator provider: openai, gemini, or offline
        #[arg(long, default_value = "gemini")]
        provider: Provider,
        /// Model name (defaults to the provider's default)
        #[arg(long)]
        model: Option<String>,
        /// API key for the provider
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the larder database (requires config file or env vars)
    DbInit,
    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Pantry management
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Meal plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show meals recorded by confirmed plans, newest first
    History {
        /// User ID
        user: String,
        /// Maximum number of meals to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8765)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user with default profile settings
    Add {
        /// Email address (must be unique)
        email: String,
    },
    /// Show a user's profile
    Show {
        /// User ID
        user: String,
    },
    /// Change profile settings
    Update {
        /// User ID
        user: String,
        /// Country used to bias cuisine (e.g. CZ)
        #[arg(long)]
        country: Option<String>,
        /// none, metric, or imperial
        #[arg(long)]
        measurement_system: Option<MeasurementSystem>,
        /// traditional or experimental
        #[arg(long)]
        variability: Option<Variability>,
        /// Whether recipes may rely on spices
        #[arg(long)]
        include_spices: Option<bool>,
    },
}

#[derive(Subcommand)]
pub enum PantryCommands {
    /// Show a user's pantry
    Show {
        /// User ID
        user: String,
    },
    /// Replace a user's pantry from a JSON or TOML file
    Set {
        /// User ID
        user: String,
        /// Path to the pantry file (`.toml` with `[[items]]`, otherwise a JSON array)
        file: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate and store a new plan from the user's pantry
    Create {
        /// User ID
        #[arg(long)]
        user: String,
        /// Number of days to plan (1-14)
        #[arg(long, default_value_t = 1)]
        days: u32,
        /// JSON file with request settings (meals per day, preferences, ...)
        #[arg(long)]
        request: Option<String>,
    },
    /// Show a stored plan
    Show {
        /// User ID
        user: String,
        /// Plan ID
        plan_id: String,
    },
    /// List a user's plans, newest first
    List {
        /// User ID
        user: String,
    },
    /// Apply a plan to the pantry and record its meals (at most once)
    Confirm {
        /// User ID
        user: String,
        /// Plan ID
        plan_id: String,
    },
    /// Combined shopping list of all unconfirmed plans
    Shopping {
        /// User ID
        user: String,
    },
}

/// Execute the `larder init` command: write config file.
fn cmd_init(
    db_url: &str,
    provider: Provider,
    model: Option<String>,
    api_key: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generator: config::GeneratorSection {
            provider,
            model,
            api_key,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url       = {db_url}");
    println!("  generator.provider = {provider}");
    if let Some(model) = &cfg.generator.model {
        println!("  generator.model    = {model}");
    }
    if has_key {
        println!("  generator.api_key  = (set)");
    } else if provider != Provider::Offline {
        println!();
        println!("No API key stored; set {} before planning.", config::API_KEY_ENV);
    }
    println!();
    println!("Next: run `larder db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `larder db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &LarderConfig) -> anyhow::Result<()> {
    println!("Initializing larder database...");

    let created = pool::ensure_database_exists(&resolved.db_config).await?;
    if created {
        println!("  created database {}", resolved.db_config.database_name().unwrap_or("?"));
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let report = pool::run_migrations(&db_pool).await?;
    println!(
        "  applied {} of {} migration(s)",
        report.applied, report.embedded
    );

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, rows) in counts.rows() {
        println!("  {table:<14} {rows} rows");
    }

    db_pool.close().await;

    println!("larder db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            provider,
            model,
            api_key,
            force,
        } => {
            cmd_init(&db_url, provider, model, api_key, force)?;
        }
        Commands::DbInit => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::User { command } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Pantry { command } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = pantry_cmds::run_pantry_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool, &resolved.generator).await;
            db_pool.close().await;
            result?;
        }
        Commands::History { user, limit } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_history(&db_pool, &user, limit).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref(), cli.offline)?;
            let gateway = resolved.generator.build_gateway()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), gateway, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
