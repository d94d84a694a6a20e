//! Database configuration module.

use std::env;

/// Connection pool settings for the Postgres contest store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Build a configuration for `database_url` with pool settings read from
    /// the environment
    ///
    /// - `DB_MAX_CONNECTIONS` (default: 20)
    /// - `DB_MIN_CONNECTIONS` (default: 2)
    /// - `DB_CONNECTION_TIMEOUT_SECS` (default: 5)
    /// - `DB_IDLE_TIMEOUT_SECS` (default: 300)
    /// - `DB_MAX_LIFETIME_SECS` (default: 1800)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env(database_url: String) -> Self {
        let defaults = Self::development();
        Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        }
    }

    /// Local development defaults
    pub fn development() -> Self {
        Self {
            database_url: "postgres://knockout@localhost/knockout".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
