//! Storage configuration
//!
//! Environment-driven configuration for the persistence layer. Variables
//! carry the `BILLING_` prefix, e.g. `BILLING_DATABASE_URL`.

use serde::Deserialize;
use std::time::Duration;

use crate::pool::DatabaseConfig;

/// Persistence configuration loaded from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database URL
    pub database_url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Minimum pool connections
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/practice".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Loads configuration from the environment
    ///
    /// Reads a `.env` file when present, then `BILLING_`-prefixed
    /// variables.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        config::Config::builder()
            .set_default("database_url", "postgres://localhost/practice")?
            .set_default("max_connections", 10)?
            .set_default("min_connections", 2)?
            .set_default("connect_timeout_secs", 30)?
            .add_source(config::Environment::with_prefix("BILLING"))
            .build()?
            .try_deserialize()
    }

    /// Returns the pool configuration derived from this config
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.max_connections, 10);
        assert!(config.database_url.starts_with("postgres://"));
    }

    #[test]
    fn test_pool_config_derivation() {
        let config = StorageConfig {
            database_url: "postgres://db/billing".to_string(),
            max_connections: 25,
            min_connections: 5,
            connect_timeout_secs: 15,
        };

        let pool = config.database();
        assert_eq!(pool.url, "postgres://db/billing");
        assert_eq!(pool.max_connections, 25);
        assert_eq!(pool.connect_timeout, Duration::from_secs(15));
    }
}
