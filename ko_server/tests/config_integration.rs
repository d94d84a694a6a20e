//! Environment-driven configuration tests.
//!
//! These mutate process environment, so they run serially.

use knockout::engine::RngSource;
use ko_server::config::{ConfigError, ServerConfig, StorageBackend};
use serial_test::serial;

const VARS: &[&str] = &[
    "SERVER_BIND",
    "STORAGE_BACKEND",
    "DATABASE_URL",
    "BRACKET_SEED",
    "ACTOR_MAILBOX_SIZE",
    "SESSION_BUFFER_SIZE",
    "METRICS_BIND",
];

fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

fn set(var: &str, value: &str) {
    unsafe { std::env::set_var(var, value) };
}

#[test]
#[serial]
fn test_defaults_use_memory_storage() {
    clear_env();

    let config = ServerConfig::from_env(None, None, None).unwrap();

    assert_eq!(config.bind.to_string(), "127.0.0.1:6969");
    assert_eq!(config.storage, StorageBackend::Memory);
    assert_eq!(config.bracket_seed, None);
    assert_eq!(config.mailbox_size, 64);
    assert!(config.metrics_bind.is_none());
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_env_values_are_read() {
    clear_env();
    set("SERVER_BIND", "0.0.0.0:8080");
    set("BRACKET_SEED", "99");
    set("ACTOR_MAILBOX_SIZE", "8");
    set("METRICS_BIND", "0.0.0.0:9090");

    let config = ServerConfig::from_env(None, None, None).unwrap();

    assert_eq!(config.bind.port(), 8080);
    assert_eq!(config.engine().rng, RngSource::Seeded(99));
    assert_eq!(config.engine().mailbox_size, 8);
    assert_eq!(config.metrics_bind.unwrap().port(), 9090);
    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_win() {
    clear_env();
    set("SERVER_BIND", "0.0.0.0:8080");
    set("STORAGE_BACKEND", "memory");

    let config = ServerConfig::from_env(
        Some("127.0.0.1:7000".parse().unwrap()),
        Some("postgres://u:p@localhost/contests".to_string()),
        Some("postgres".to_string()),
    )
    .unwrap();

    assert_eq!(config.bind.port(), 7000);
    match config.storage {
        StorageBackend::Postgres(db) => {
            assert_eq!(db.database_url, "postgres://u:p@localhost/contests")
        }
        other => panic!("expected postgres, got {other:?}"),
    }
    clear_env();
}

#[test]
#[serial]
fn test_postgres_requires_database_url() {
    clear_env();
    set("STORAGE_BACKEND", "postgres");

    let err = ServerConfig::from_env(None, None, None).unwrap_err();

    assert!(matches!(err, ConfigError::MissingRequired { .. }));
    assert!(err.to_string().contains("DATABASE_URL"));
    clear_env();
}

#[test]
#[serial]
fn test_unknown_backend_and_bad_values_rejected() {
    clear_env();
    set("STORAGE_BACKEND", "sqlite");
    assert!(matches!(
        ServerConfig::from_env(None, None, None),
        Err(ConfigError::Invalid { .. })
    ));

    clear_env();
    set("BRACKET_SEED", "not-a-number");
    assert!(matches!(
        ServerConfig::from_env(None, None, None),
        Err(ConfigError::Invalid { .. })
    ));
    clear_env();
}
