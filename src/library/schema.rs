//! Database schema definition and versioning for the track catalog.
//!
//! This module defines the SQLite schema and provides schema versioning
//! so a future column change can be migrated instead of recreated.

use std::{path::Path, str::FromStr};

use {
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    },
    thiserror::Error,
    tracing::debug,
};

/// Error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),
    /// Schema migration error.
    #[error("Schema migration error: {reason}")]
    MigrationError { reason: String },
}

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Creates and versions the catalog schema.
pub struct SchemaManager {
    pool: SqlitePool,
}

impl SchemaManager {
    /// Creates a new schema manager over `pool`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initializes the database schema.
    ///
    /// Creates the tables on a fresh database and checks the stored version
    /// on an existing one.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if table creation fails or the stored version
    /// is one this build cannot migrate from.
    pub async fn initialize_schema(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let current_version: Option<i32> =
            sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match current_version {
            None => {
                debug!("Creating catalog schema version {CURRENT_SCHEMA_VERSION}");
                self.create_tables().await?;
                sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                    .bind(CURRENT_SCHEMA_VERSION)
                    .execute(&self.pool)
                    .await?;
            }
            Some(version) if version == CURRENT_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(SchemaError::MigrationError {
                    reason: format!("Schema migration from version {version} not implemented"),
                });
            }
        }

        Ok(())
    }

    async fn create_tables(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE tracks (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                album TEXT NOT NULL,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                path TEXT NOT NULL UNIQUE,
                date_added INTEGER NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                album_id INTEGER,
                artwork_path TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX idx_tracks_date_added ON tracks (date_added)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX idx_tracks_path ON tracks (path)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets the current schema version, or 0 if not initialized.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the version table cannot be queried.
    pub async fn get_current_version(&self) -> Result<i32, SchemaError> {
        let version: Option<i32> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(version.unwrap_or(0))
    }
}

/// Creates a connection pool for the database file at `database_path`.
///
/// # Errors
///
/// Returns `SchemaError` if the file cannot be opened or created.
pub async fn create_connection_pool(database_path: &Path) -> Result<SqlitePool, SchemaError> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Creates a single-connection in-memory pool.
///
/// The connection never idles out, so the database lives as long as the pool.
///
/// # Errors
///
/// Returns `SchemaError` if SQLite cannot be opened.
pub async fn create_memory_pool() -> Result<SqlitePool, SchemaError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use crate::library::schema::{
        CURRENT_SCHEMA_VERSION, SchemaError, SchemaManager, create_memory_pool,
    };

    #[test]
    fn test_schema_error_display() {
        let migration_error = SchemaError::MigrationError {
            reason: "test error".to_string(),
        };
        assert_eq!(
            migration_error.to_string(),
            "Schema migration error: test error"
        );
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        let manager = SchemaManager::new(pool.clone());

        assert_eq!(manager.get_current_version().await.ok(), None);
        manager.initialize_schema().await.unwrap();
        manager.initialize_schema().await.unwrap();
        assert_eq!(
            manager.get_current_version().await.unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[tokio::test]
    async fn test_newer_schema_is_rejected() {
        let pool = create_memory_pool().await.unwrap();
        let manager = SchemaManager::new(pool.clone());
        manager.initialize_schema().await.unwrap();

        sqlx::query("UPDATE schema_version SET version = 99")
            .execute(&pool)
            .await
            .unwrap();

        let error = manager.initialize_schema().await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Schema migration error: Schema migration from version 99 not implemented"
        );
    }
}
