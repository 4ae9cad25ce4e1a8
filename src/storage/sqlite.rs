//! SQLite-backed log store
//!
//! - Connection pooling with WAL for concurrent reads during ingestion
//! - Embedded migrations for the reserved tables
//! - Topic tables created on demand

use super::{checked_table_name, is_reserved_table, LogStorage, StorageError};
use crate::config::StorageConfig;
use crate::models::LogRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// Log store handle
///
/// Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    source: String,
    payload: String,
    level: String,
    timestamp: String,
    caller_data: Option<String>,
    extra_data: Option<String>,
}

impl From<LogRow> for LogRecord {
    fn from(row: LogRow) -> Self {
        LogRecord {
            id: Some(row.id),
            source: row.source,
            payload: row.payload,
            level: row.level,
            timestamp: row.timestamp,
            caller_data: decode_json_text(row.caller_data),
            extra_data: decode_json_text(row.extra_data),
        }
    }
}

impl SqliteLogStore {
    /// Open (creating if needed) the database file and run migrations
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to connect to log database")?;

        tracing::info!(database = %config.database_path, "Connected to log database");

        Self::from_pool(pool).await
    }

    /// Private in-memory database
    ///
    /// Pinned to one connection that never expires: each SQLite memory
    /// connection is a separate database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations first
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run log database migrations")?;

        tracing::debug!("Log database migrations completed");
        Ok(Self { pool })
    }

    /// Underlying pool, shared with [`super::SettingsStore`]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LogStorage for SqliteLogStore {
    async fn table_exists(&self, name: &str) -> bool {
        let result = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "Failed to check if table exists");
                false
            }
        }
    }

    async fn create_topic_table(&self, name: &str) -> Result<(), StorageError> {
        let table = checked_table_name(name)?;

        let sql = format!(
            r#"CREATE TABLE "{table}" (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                source      TEXT NOT NULL,
                payload     TEXT NOT NULL,
                level       TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                caller_data TEXT,
                extra_data  TEXT
            )"#
        );

        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => {
                tracing::info!(table = %table, "Created topic table");
                Ok(())
            }
            Err(e) if is_already_exists(&e) => {
                tracing::debug!(table = %table, "Topic table already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, table: &str, record: &LogRecord) -> Result<i64, StorageError> {
        let table = checked_table_name(table)?;

        let caller_data = record.caller_data.as_ref().map(serde_json::to_string).transpose()?;
        let extra_data = record.extra_data.as_ref().map(serde_json::to_string).transpose()?;

        let sql = format!(
            r#"INSERT INTO "{table}" (source, payload, level, timestamp, caller_data, extra_data)
               VALUES (?, ?, ?, ?, ?, ?)"#
        );

        let result = sqlx::query(&sql)
            .bind(&record.source)
            .bind(&record.payload)
            .bind(&record.level)
            .bind(&record.timestamp)
            .bind(caller_data)
            .bind(extra_data)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_topic_tables(&self) -> Result<Vec<String>, StorageError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().filter(|name| !is_reserved_table(name)).collect())
    }

    async fn list_recent(&self, table: &str, limit: u32) -> Result<Vec<LogRecord>, StorageError> {
        let table = checked_table_name(table)?;

        let sql = format!(
            r#"SELECT id, source, payload, level, timestamp, caller_data, extra_data
               FROM "{table}"
               ORDER BY id DESC
               LIMIT ?"#
        );

        let rows = sqlx::query_as::<_, LogRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        let mut records: Vec<LogRecord> = rows.into_iter().map(LogRecord::from).collect();
        // Stable sort: equal timestamps keep newest-insert-first order
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(records)
    }

    async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<LogRecord>, StorageError> {
        let table = checked_table_name(table)?;

        let sql = format!(
            r#"SELECT id, source, payload, level, timestamp, caller_data, extra_data
               FROM "{table}"
               WHERE id = ?"#
        );

        let row = sqlx::query_as::<_, LogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LogRecord::from))
    }
}

fn is_already_exists(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("already exists"))
}

/// Stored context is JSON text; anything that fails to parse is returned as a string
fn decode_json_text(text: Option<String>) -> Option<Value> {
    text.map(|t| serde_json::from_str::<Value>(&t).unwrap_or_else(|_| Value::String(t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(source: &str, timestamp: &str) -> LogRecord {
        LogRecord {
            id: None,
            source: source.to_string(),
            payload: format!("payload from {}", source),
            level: "info".to_string(),
            timestamp: timestamp.to_string(),
            caller_data: None,
            extra_data: None,
        }
    }

    #[tokio::test]
    async fn test_create_topic_table_is_idempotent() {
        let store = SqliteLogStore::in_memory().await.unwrap();

        assert!(!store.table_exists("alerts").await);
        store.create_topic_table("alerts").await.unwrap();
        store.create_topic_table("alerts").await.unwrap();
        assert!(store.table_exists("alerts").await);

        let tables = store.list_topic_tables().await.unwrap();
        assert_eq!(tables, vec!["alerts".to_string()]);
    }

    #[tokio::test]
    async fn test_table_exists_ignores_case() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.create_topic_table("Alerts").await.unwrap();
        assert!(store.table_exists("alerts").await);
        assert!(store.table_exists("ALERTS").await);
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.ensure_topic_table("metrics").await.unwrap();

        let first = store.insert("metrics", &record("a", "2024-01-01T00:00:00.000Z")).await.unwrap();
        let second = store.insert("metrics", &record("b", "2024-01-01T00:00:01.000Z")).await.unwrap();
        assert!(second > first);

        let fetched = store.get_by_id("metrics", second).await.unwrap().unwrap();
        assert_eq!(fetched.id, Some(second));
        assert_eq!(fetched.source, "b");
    }

    #[tokio::test]
    async fn test_insert_without_table_fails() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        let result = store.insert("missing", &record("a", "2024")).await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_invalid_and_reserved_names_are_refused() {
        let store = SqliteLogStore::in_memory().await.unwrap();

        let result = store.create_topic_table("x\"; DROP TABLE settings; --").await;
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));

        let result = store.create_topic_table("settings").await;
        assert!(matches!(result, Err(StorageError::ReservedTable(_))));

        let result = store.insert("settings", &record("a", "2024")).await;
        assert!(matches!(result, Err(StorageError::ReservedTable(_))));

        let result = store.list_recent("a-b", 10).await;
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn test_list_topic_tables_excludes_reserved() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.create_topic_table("zeta").await.unwrap();
        store.create_topic_table("alpha").await.unwrap();

        // AUTOINCREMENT creates sqlite_sequence, migrations create settings and _sqlx_migrations
        let tables = store.list_topic_tables().await.unwrap();
        assert_eq!(tables, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn test_list_recent_limits_and_sorts() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.create_topic_table("t").await.unwrap();

        for i in 0..500 {
            // Timestamps repeat every 100 rows, so the result contains ties
            let ts = format!("2024-01-01T00:{:02}:{:02}.000Z", (i % 100) / 60, (i % 100) % 60);
            store.insert("t", &record(&format!("s{}", i), &ts)).await.unwrap();
        }

        let records = store.list_recent("t", 300).await.unwrap();
        assert_eq!(records.len(), 300);

        // Only the 300 most recent inserts (ids 201..=500) are candidates
        assert!(records.iter().all(|r| r.id.unwrap() > 200));

        for pair in records.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
            if pair[0].timestamp == pair[1].timestamp {
                // Ties keep store order: newest insert first
                assert!(pair[0].id > pair[1].id);
            }
        }
    }

    #[tokio::test]
    async fn test_list_recent_missing_table_is_error() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        assert!(store.list_recent("nope", 300).await.is_err());
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_none() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.create_topic_table("t").await.unwrap();
        store.insert("t", &record("a", "2024")).await.unwrap();

        assert!(store.get_by_id("t", 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_caller_data_round_trips_as_json() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        store.create_topic_table("t").await.unwrap();

        let mut rec = record("a", "2024-01-01T00:00:00.000Z");
        rec.caller_data = Some(json!({"file": "main.rs", "line": 42}));
        let id = store.insert("t", &rec).await.unwrap();

        let fetched = store.get_by_id("t", id).await.unwrap().unwrap();
        assert_eq!(fetched.caller_data, Some(json!({"file": "main.rs", "line": 42})));
        assert_eq!(fetched.extra_data, None);
    }

    #[test]
    fn test_decode_json_text_falls_back_to_string() {
        assert_eq!(decode_json_text(None), None);
        assert_eq!(decode_json_text(Some("{\"a\":1}".to_string())), Some(json!({"a": 1})));
        assert_eq!(decode_json_text(Some("plain text".to_string())), Some(json!("plain text")));
    }

    #[tokio::test]
    async fn test_concurrent_first_writers_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("race.db").to_string_lossy().into_owned(),
            max_connections: 4,
            recent_limit: 300,
        };
        let store = SqliteLogStore::connect(&config).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.ensure_topic_table("fresh").await?;
                store.insert("fresh", &record(&format!("w{}", i), "2024")).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list_topic_tables().await.unwrap(), vec!["fresh".to_string()]);
        assert_eq!(store.list_recent("fresh", 300).await.unwrap().len(), 8);
    }
}
