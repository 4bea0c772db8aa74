use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub storage_url: String,
    #[serde(default)]
    pub storage_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Postgres schema the REST endpoint exposes the tables under.
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `AGORA_`-prefixed environment variables, `__` between sections
    ///    (`AGORA_STORAGE__SCHEMA`, `AGORA_LOGGING__LEVEL`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut cfg = Self::layered(Path::new("config"), &env, env_overrides())?;

        // Load secrets from ENV (not in TOML)
        cfg.storage_url = std::env::var("STORAGE_URL").map_err(|_| {
            ConfigError::Message("STORAGE_URL environment variable is required".to_string())
        })?;
        cfg.storage_api_key = std::env::var("STORAGE_API_KEY").map_err(|_| {
            ConfigError::Message("STORAGE_API_KEY environment variable is required".to_string())
        })?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    fn layered(dir: &Path, env: &str, overrides: Environment) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join(env).to_string_lossy()).required(false))
            .add_source(overrides)
            .build()?
            .try_deserialize()
    }
}

fn env_overrides() -> Environment {
    Environment::with_prefix("AGORA")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
