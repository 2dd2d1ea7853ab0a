//! # SQLite Storage
//!
//! [`Storage`] backed by a single `kv_store` table.
//!
//! ## Setup
//! ```text
//! StorageConfig::new(path) ─► SqliteStorage::open(config).await
//!                                │
//!                                ├── WAL journal, NORMAL synchronous
//!                                ├── pool (max_connections)
//!                                └── embedded migrations (kv_store)
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::migrations;
use crate::storage::Storage;

// =============================================================================
// Configuration
// =============================================================================

/// SQLite storage configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StorageConfig::new("/path/to/vielra.db").max_connections(2);
/// let storage = SqliteStorage::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections.
    /// Default: 4
    pub max_connections: u32,

    /// Connection acquire timeout.
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on open.
    /// Default: true
    pub run_migrations: bool,
}

impl StorageConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StorageConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory database (for testing). Single connection, so every
    /// query sees the same database.
    pub fn in_memory() -> Self {
        StorageConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// SQLite Storage
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens the database, creating the file if needed.
    pub async fn open(config: StorageConfig) -> StorageResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening storage database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Storage pool created");

        let storage = SqliteStorage { pool };
        if config.run_migrations {
            migrations::run_migrations(&storage.pool).await?;
        }
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns true if the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing storage database");
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(key, e))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(key, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let storage = SqliteStorage::open(StorageConfig::in_memory()).await.unwrap();
        assert!(storage.health_check().await);

        assert_eq!(storage.get("vielra:app").await.unwrap(), None);
        storage.set("vielra:app", b"{}".to_vec()).await.unwrap();
        storage.set("vielra:app", b"{\"a\":1}".to_vec()).await.unwrap();
        assert_eq!(
            storage.get("vielra:app").await.unwrap(),
            Some(b"{\"a\":1}".to_vec())
        );

        storage.remove("vielra:app").await.unwrap();
        assert_eq!(storage.get("vielra:app").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vielra.db");

        let storage = SqliteStorage::open(StorageConfig::new(&path)).await.unwrap();
        storage.set("access_token", b"tok".to_vec()).await.unwrap();
        storage.close().await;

        let reopened = SqliteStorage::open(StorageConfig::new(&path)).await.unwrap();
        assert_eq!(
            reopened.get("access_token").await.unwrap(),
            Some(b"tok".to_vec())
        );
    }

    #[test]
    fn test_config_builder() {
        let config = StorageConfig::new("/tmp/v.db")
            .max_connections(8)
            .run_migrations(false);
        assert_eq!(config.max_connections, 8);
        assert!(!config.run_migrations);
    }
}
