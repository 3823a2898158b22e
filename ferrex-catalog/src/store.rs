use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ferrex_contracts::Observer;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{Result, StorageError};

/// The single-writer, many-reader catalog (§3, §4.2). Wraps a
/// `SqlitePool` configured for WAL + a busy timeout so concurrent writers
/// degrade to a bounded wait instead of an immediate `SQLITE_BUSY`.
#[derive(Clone)]
pub struct CatalogStore {
    pub(crate) pool: SqlitePool,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) slow_query_threshold: Duration,
    pub(crate) session_window_secs: i64,
    pub(crate) session_extend_threshold: f64,
}

impl CatalogStore {
    /// Opens (creating if absent) the catalog database under
    /// `database_dir` and runs pending migrations.
    pub async fn open(
        database_dir: &Path,
        observer: Arc<dyn Observer>,
        slow_query_threshold: Duration,
        session_window_secs: i64,
        session_extend_threshold: f64,
    ) -> Result<Self> {
        std::fs::create_dir_all(database_dir)
            .map_err(|e| StorageError::Storage(format!("create database_dir: {e}")))?;
        let db_path = database_dir.join("catalog.db");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            StorageError::Storage(format!("migration failed: {e}"))
        })?;

        Ok(Self {
            pool,
            observer,
            slow_query_threshold,
            session_window_secs,
            session_extend_threshold,
        })
    }

    /// In-memory catalog for tests; migrations still run.
    pub async fn open_in_memory(observer: Arc<dyn Observer>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            StorageError::Storage(format!("migration failed: {e}"))
        })?;
        Ok(Self {
            pool,
            observer,
            slow_query_threshold: Duration::from_millis(200),
            session_window_secs: 24 * 60 * 60,
            session_extend_threshold: 0.10,
        })
    }

    pub(crate) async fn timed<T, E, F, Fut>(&self, label: &'static str, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        if elapsed >= self.slow_query_threshold {
            tracing::warn!(query = label, ?elapsed, "slow catalog query");
        }
        result
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
