//! Connection pool construction.
//!
//! The pool is built once, lazily, from an externally-provided secret. It
//! is bounded and carries both a connect timeout and idle recycling —
//! timeouts are the only bounding mechanism the core relies on.

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use rolodex_commons::{RolodexError, RolodexResult};
use serde::Deserialize;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Database credentials as delivered by the secret store.
#[derive(Debug, Clone, Deserialize)]
pub struct DbSecret {
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub host: String,
    pub port: u16,
}

/// Pool sizing and timeout settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Timeout for establishing a new connection, seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for acquiring a connection from the pool, seconds.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
}

fn default_max_size() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_wait_timeout() -> u64 {
    30
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            connect_timeout_secs: default_connect_timeout(),
            wait_timeout_secs: default_wait_timeout(),
        }
    }
}

/// Builds the bounded connection pool. Connections are established on
/// demand, so this never touches the network itself.
pub fn create_pool(secret: &DbSecret, settings: &PoolSettings) -> RolodexResult<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(secret.host.clone());
    cfg.port = Some(secret.port);
    cfg.dbname = Some(secret.dbname.clone());
    cfg.user = Some(secret.username.clone());
    cfg.password = Some(secret.password.clone());
    cfg.connect_timeout = Some(Duration::from_secs(settings.connect_timeout_secs));

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig {
        max_size: settings.max_size,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(settings.wait_timeout_secs)),
            create: Some(Duration::from_secs(settings.connect_timeout_secs)),
            recycle: Some(Duration::from_secs(settings.connect_timeout_secs)),
        },
        ..PoolConfig::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| RolodexError::Config(format!("Failed to create pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> DbSecret {
        DbSecret {
            username: "rolodex".into(),
            password: "rolodex".into(),
            dbname: "rolodex".into(),
            host: "localhost".into(),
            port: 5432,
        }
    }

    #[test]
    fn test_pool_settings_defaults() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_size, 10);
        assert_eq!(settings.connect_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // No live database here: creating the pool must still succeed
        // because connections are only established on first acquisition.
        let pool = create_pool(&secret(), &PoolSettings::default()).unwrap();
        assert_eq!(pool.status().size, 0);
    }
}
