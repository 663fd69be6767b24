//! Deployment configuration and the secret lookup seam.
//!
//! Loaded from a TOML file with `ROLODEX_*` environment overrides taking
//! precedence, then validated. Database credentials never live in the
//! config file: they come from a `SecretProvider`, which in production is
//! the vault client and locally reads environment variables.

use async_trait::async_trait;
use rolodex_commons::{RolodexError, RolodexResult};
use rolodex_pg::{DbSecret, PoolSettings};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Which storage engine is authoritative for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Relational,
    KeyValue,
}

/// Main deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    pub backend: BackendKind,
    #[serde(default)]
    pub relational: RelationalSettings,
    #[serde(default)]
    pub keyvalue: KvSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Relational backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationalSettings {
    /// Name of the secret holding database credentials.
    #[serde(default = "default_secret_name")]
    pub secret_name: String,
    #[serde(default)]
    pub pool: PoolSettings,
}

/// Key-value backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct KvSettings {
    /// Path of the RocksDB database directory.
    #[serde(default = "default_data_path")]
    pub path: String,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Base level: trace/debug/info/warn/error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "compact" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_secret_name() -> String {
    "rolodex/db".to_string()
}

fn default_data_path() -> String {
    "./data/rolodex".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for RelationalSettings {
    fn default() -> Self {
        Self {
            secret_name: default_secret_name(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for KvSettings {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl DeploymentConfig {
    /// Loads configuration from a TOML file, applies environment
    /// overrides, and validates.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        let mut config: DeploymentConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take precedence over config file values.
    ///
    /// Supported:
    /// - `ROLODEX_BACKEND`: "relational" or "keyvalue"
    /// - `ROLODEX_DB_SECRET`: relational.secret_name
    /// - `ROLODEX_DATA_DIR`: keyvalue.path
    /// - `ROLODEX_LOG_LEVEL`: logging.level
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(backend) = env::var("ROLODEX_BACKEND") {
            self.backend = match backend.to_lowercase().as_str() {
                "relational" => BackendKind::Relational,
                "keyvalue" => BackendKind::KeyValue,
                other => {
                    return Err(anyhow::anyhow!("Invalid ROLODEX_BACKEND value: {}", other))
                }
            };
        }
        if let Ok(name) = env::var("ROLODEX_DB_SECRET") {
            self.relational.secret_name = name;
        }
        if let Ok(path) = env::var("ROLODEX_DATA_DIR") {
            self.keyvalue.path = path;
        }
        if let Ok(level) = env::var("ROLODEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validates configuration settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.relational.pool.max_size == 0 {
            return Err(anyhow::anyhow!("relational.pool.max_size cannot be 0"));
        }
        if self.keyvalue.path.is_empty() {
            return Err(anyhow::anyhow!("keyvalue.path cannot be empty"));
        }
        Ok(())
    }
}

/// Secret lookup seam. The core uses it exactly once, to lazily construct
/// the relational pool; it never authenticates callers itself.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetches database credentials by secret name.
    async fn get_secret(&self, name: &str) -> RolodexResult<DbSecret>;
}

/// Secret provider backed by environment variables, for local use.
///
/// Reads `ROLODEX_DB_USER`, `ROLODEX_DB_PASS`, `ROLODEX_DB_NAME`,
/// `ROLODEX_DB_HOST`, `ROLODEX_DB_PORT`, with local-development defaults.
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, _name: &str) -> RolodexResult<DbSecret> {
        use std::env;
        let port = match env::var("ROLODEX_DB_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| RolodexError::Config(format!("Invalid ROLODEX_DB_PORT: {raw}")))?,
            Err(_) => 5432,
        };
        Ok(DbSecret {
            username: env::var("ROLODEX_DB_USER").unwrap_or_else(|_| "rolodex".to_string()),
            password: env::var("ROLODEX_DB_PASS").unwrap_or_else(|_| "rolodex".to_string()),
            dbname: env::var("ROLODEX_DB_NAME").unwrap_or_else(|_| "rolodex".to_string()),
            host: env::var("ROLODEX_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port,
        })
    }
}
