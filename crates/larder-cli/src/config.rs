//! Configuration file management for larder.
//!
//! Provides a TOML config file at `~/.config/larder/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use larder_core::generator::{GeneratorSettings, Provider};
use larder_db::config::DbConfig;

pub const PROVIDER_ENV: &str = "LARDER_LLM_PROVIDER";
pub const MODEL_ENV: &str = "LARDER_LLM_MODEL";
pub const API_KEY_ENV: &str = "LARDER_LLM_API_KEY";
pub const OFFLINE_ENV: &str = "LARDER_LLM_OFFLINE";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the larder config directory: `$XDG_CONFIG_HOME/larder` or
/// `~/.config/larder`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("larder");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("larder")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write `config` to `path`, creating parent dirs. The file is made
/// owner-only (0600) on Unix since it may hold an API key.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&config_path(), config)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct LarderConfig {
    pub db_config: DbConfig,
    pub generator: GeneratorSettings,
}

impl LarderConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `LARDER_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Provider: `--offline` or truthy `LARDER_LLM_OFFLINE` > `LARDER_LLM_PROVIDER` >
    ///   `generator.provider` > gemini
    /// - Model and API key: env var > config file > unset
    ///
    /// A missing API key is not an error here; it surfaces when a backend
    /// is built.
    pub fn resolve(cli_db_url: Option<&str>, cli_offline: bool) -> Result<Self> {
        let file_config = load_config().ok();
        let file_generator = file_config.as_ref().map(|c| &c.generator);

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_nonempty(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let offline = cli_offline || env_nonempty(OFFLINE_ENV).is_some_and(|v| is_truthy(&v));
        let provider = if offline {
            Provider::Offline
        } else if let Some(name) = env_nonempty(PROVIDER_ENV) {
            name.parse()
                .with_context(|| format!("invalid {PROVIDER_ENV}"))?
        } else {
            file_generator.map(|g| g.provider).unwrap_or_default()
        };

        let model = env_nonempty(MODEL_ENV).or_else(|| file_generator.and_then(|g| g.model.clone()));
        let api_key =
            env_nonempty(API_KEY_ENV).or_else(|| file_generator.and_then(|g| g.api_key.clone()));

        Ok(Self {
            db_config: DbConfig::new(db_url),
            generator: GeneratorSettings {
                provider,
                model,
                api_key,
            },
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
