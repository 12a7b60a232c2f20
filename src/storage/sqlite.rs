use async_trait::async_trait;
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use super::types::{quote_identifier, StoreError, SubscriptionStore, PRESENCE_MARKER};
use crate::config::StoreConfig;

/// SQLite rendition of the subscription table.
///
/// Keeps the wide-column shape (`key`, `column1`, `value`) so the same rows
/// could be bulk-loaded into the production cluster. Used for local runs and
/// as the persistence backend in tests.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    request_timeout: Duration,
    select_sql: String,
    upsert_sql: String,
    delete_sql: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `config.sqlite_path` and
    /// ensure the subscription table exists.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = config.sqlite_path.as_str();
        let url = format!("sqlite:{}?mode=rwc", path);

        // SEC-010: Pre-create the database file user-only before the pool opens it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // If creation fails, SQLite will report the error at connect_with.
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StoreError::Unreachable(e.to_string()))?
            .pragma("busy_timeout", "5000");
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(config.connect_timeout());
        if path == ":memory:" {
            // The shared in-memory database lives only while a connection holds it
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let table = quote_identifier(&config.table);
        let store = Self {
            pool,
            request_timeout: config.request_timeout(),
            select_sql: format!("SELECT column1 FROM {table} WHERE key = ? ORDER BY column1"),
            upsert_sql: format!(
                "INSERT INTO {table} (key, column1, value) VALUES (?, ?, ?) \
                 ON CONFLICT(key, column1) DO UPDATE SET value = excluded.value"
            ),
            delete_sql: format!("DELETE FROM {table} WHERE key = ? AND column1 = ?"),
        };
        store.create_table(&table).await?;

        tracing::info!(path = %path, table = %config.table, "Opened sqlite subscription store");
        Ok(store)
    }

    /// Open a private in-memory store with default settings.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let config = StoreConfig {
            sqlite_path: ":memory:".to_string(),
            ..StoreConfig::default()
        };
        Self::open(&config).await
    }

    /// Close the pool. Every later call fails with [`StoreError::Unreachable`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_table(&self, table: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key TEXT NOT NULL,
                column1 TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, column1)
            )
        "#
        ))
        .execute(&mut *conn)
        .await
        .map_err(StoreError::write)?;
        Ok(())
    }

    /// Check a connection out of the pool. It returns to the pool when dropped,
    /// on success and error paths alike.
    async fn connection(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }

    async fn bounded<T, F>(
        &self,
        op: F,
        on_error: fn(String) -> StoreError,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, op).await {
            Ok(result) => result.map_err(|e| on_error(e.to_string())),
            Err(_) => Err(on_error(format!(
                "timed out after {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn list_feed_urls(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        let rows: Vec<(String,)> = self
            .bounded(
                sqlx::query_as(&self.select_sql)
                    .bind(user)
                    .fetch_all(&mut *conn),
                StoreError::QueryFailed,
            )
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    async fn add_subscription(&self, user: &str, url: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(
            sqlx::query(&self.upsert_sql)
                .bind(user)
                .bind(url)
                .bind(PRESENCE_MARKER)
                .execute(&mut *conn),
            StoreError::WriteFailed,
        )
        .await?;
        Ok(())
    }

    async fn remove_subscription(&self, user: &str, url: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(
            sqlx::query(&self.delete_sql)
                .bind(user)
                .bind(url)
                .execute(&mut *conn),
            StoreError::WriteFailed,
        )
        .await?;
        Ok(())
    }
}
