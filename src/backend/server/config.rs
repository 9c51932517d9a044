/**
 * Database Loading
 *
 * Connects to PostgreSQL when `DATABASE_URL` is configured and runs the
 * migrations in `migrations/`. The in-memory store is used only when no URL
 * is set; a configured database that cannot be reached or migrated stops
 * startup.
 */

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::backend::store::{MemoryStore, PgStore, Stores};
use crate::shared::AppConfig;

/// Database configuration result
pub type DatabaseConfig = Option<PgPool>;

/// Failures that stop the server before it serves anything
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to run database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Connect to the configured database and migrate it
///
/// Returns `Ok(None)` if no URL is configured.
pub async fn load_database(config: &AppConfig) -> Result<DatabaseConfig, StartupError> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory store.");
        return Ok(None);
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            StartupError::Connect(e)
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        StartupError::from(e)
    })?;
    tracing::info!("Database migrations completed successfully");

    Ok(Some(pool))
}

/// Pick the persistence backend for this process
pub fn build_stores(pool: DatabaseConfig) -> Stores {
    match pool {
        Some(pool) => Stores::from_backend(Arc::new(PgStore::new(pool))),
        None => Stores::from_backend(Arc::new(MemoryStore::new())),
    }
}
