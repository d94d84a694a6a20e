//! Knockout contest server.
//!
//! Spawns one contest actor per contest on demand, backed by either an
//! in-memory store or Postgres, and pushes match outcomes over WebSockets.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use knockout::{
    ContestManager, SessionHub,
    db::{ContestRepository, Database, InMemoryContestRepository, PgContestRepository},
};
use ko_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a knockout contest server

USAGE:
  ko_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage    BACKEND     memory or postgres          [default: env STORAGE_BACKEND or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          memory | postgres
  DATABASE_URL             PostgreSQL connection string
  BRACKET_SEED             Fixed pairing seed for reproducible brackets
  ACTOR_MAILBOX_SIZE       Contest actor mailbox capacity
  SESSION_BUFFER_SIZE      Events buffered per WebSocket session
  METRICS_BIND             Prometheus exporter address
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let storage: Option<String> = pargs.opt_value_from_str("--storage")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, storage)?;
    config.validate()?;

    info!(
        "Starting knockout server at {} with {} storage",
        config.bind,
        config.storage.name()
    );

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind)
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
        info!("Prometheus metrics exposed at {}", metrics_bind);
    }

    let (repository, database): (Arc<dyn ContestRepository>, Option<Database>) =
        match &config.storage {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; contests are lost on restart");
                (Arc::new(InMemoryContestRepository::new()), None)
            }
            StorageBackend::Postgres(db_config) => {
                let db = Database::new(db_config)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
                db.migrate()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
                info!("Database connected and migrated");

                (Arc::new(PgContestRepository::new(db.pool().clone())), Some(db))
            }
        };

    let sessions = Arc::new(SessionHub::new(config.session_buffer_size));
    let publisher = Arc::new(metrics::MeteredPublisher::new(sessions.clone()));
    let contest_manager = Arc::new(ContestManager::new(
        repository,
        publisher,
        config.engine(),
    ));

    let app = api::create_router(api::AppState {
        contest_manager: contest_manager.clone(),
        sessions,
        database: database.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    contest_manager.shutdown().await;
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
