//! SQLite persistence for the records the pipeline materializes.
//!
//! Functions that take part in a per-entity transaction accept
//! `&mut SqliteConnection` so callers can pass `&mut *tx`.

pub mod boards;
pub mod contacts;
pub mod expenses;
pub mod tasks;
pub mod vendors;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;

/// Schema applied by [`apply_schema`].
pub const SCHEMA_SQL: &str = include_str!("../../migrations/001_schema.sql");

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON column encode/decode failure.
    #[error("json column error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Open a connection pool for `config`, creating the file if missing.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database cannot be opened.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create every table and index that does not exist yet.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    tracing::debug!("schema applied");
    Ok(())
}

/// Cheap liveness probe.
///
/// # Errors
///
/// Returns an error if the database does not answer.
pub async fn ping(pool: &SqlitePool) -> Result<(), StoreError> {
    let _: (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// New random record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `None` for missing or whitespace-only values, trimmed otherwise.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
