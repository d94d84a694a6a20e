//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use knockout::{
    EngineConfig,
    db::DatabaseConfig,
    engine::RngSource,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Where contests are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store, lost on restart
    Memory,
    /// Postgres via `DATABASE_URL`
    Postgres(DatabaseConfig),
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Postgres(_) => "postgres",
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Contest storage
    pub storage: StorageBackend,
    /// Fixed pairing seed, if brackets should be reproducible
    pub bracket_seed: Option<u64>,
    /// Contest actor mailbox capacity
    pub mailbox_size: usize,
    /// Undelivered events buffered per WebSocket session
    pub session_buffer_size: usize,
    /// Prometheus exporter address, if enabled
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional storage backend name override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_opt("SERVER_BIND")?
                .unwrap_or(SocketAddr::from((Ipv4Addr::LOCALHOST, 6969))),
        };

        let storage_name = storage_override
            .or_else(|| std::env::var("STORAGE_BACKEND").ok())
            .unwrap_or_else(|| "memory".to_string());

        let storage = match storage_name.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgres" => {
                let database_url = database_url_override
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| ConfigError::MissingRequired {
                        var: "DATABASE_URL".to_string(),
                        hint: "Required when STORAGE_BACKEND=postgres".to_string(),
                    })?;
                StorageBackend::Postgres(DatabaseConfig::from_env(database_url))
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND".to_string(),
                    reason: format!("Unknown backend '{other}', expected 'memory' or 'postgres'"),
                });
            }
        };

        Ok(ServerConfig {
            bind,
            storage,
            bracket_seed: parse_env_opt("BRACKET_SEED")?,
            mailbox_size: parse_env_or("ACTOR_MAILBOX_SIZE", 64),
            session_buffer_size: parse_env_or("SESSION_BUFFER_SIZE", 32),
            metrics_bind: parse_env_opt("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_size == 0 {
            return Err(ConfigError::Invalid {
                var: "ACTOR_MAILBOX_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.session_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_BUFFER_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let StorageBackend::Postgres(db) = &self.storage
            && db.max_connections == 0
        {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let StorageBackend::Postgres(db) = &self.storage
            && db.min_connections > db.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!("Cannot exceed max connections ({})", db.max_connections),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            mailbox_size: self.mailbox_size,
            rng: match self.bracket_seed {
                Some(seed) => RngSource::Seeded(seed),
                None => RngSource::Entropy,
            },
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an optional variable; present but malformed is an error
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Memory,
            bracket_seed: None,
            mailbox_size: 64,
            session_buffer_size: 32,
            metrics_bind: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Set it".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Set it"));
    }

    #[test]
    fn test_config_validation_zero_mailbox() {
        let config = ServerConfig {
            mailbox_size: 0,
            ..base_config()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut db = DatabaseConfig::development();
        db.min_connections = 50;
        db.max_connections = 10;
        let config = ServerConfig {
            storage: StorageBackend::Postgres(db),
            ..base_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_config_validation_zero_pool() {
        let mut db = DatabaseConfig::development();
        db.min_connections = 0;
        db.max_connections = 0;
        let config = ServerConfig {
            storage: StorageBackend::Postgres(db.clone()),
            ..base_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));

        db.max_connections = 4;
        let config = ServerConfig {
            storage: StorageBackend::Postgres(db),
            ..base_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_metrics_port_clash() {
        let config = ServerConfig {
            metrics_bind: Some("127.0.0.1:8080".parse().unwrap()),
            ..base_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_from_seed() {
        let config = ServerConfig {
            bracket_seed: Some(7),
            mailbox_size: 16,
            ..base_config()
        };
        let engine = config.engine();
        assert_eq!(engine.rng, RngSource::Seeded(7));
        assert_eq!(engine.mailbox_size, 16);
        assert_eq!(base_config().engine().rng, RngSource::Entropy);
    }
}
