//! Durable storage for topic logs
//!
//! Every topic gets its own table, created lazily on first write. Topic names are
//! untrusted input that end up in the identifier position of SQL statements, so
//! every entry point checks them with [`crate::topic::is_valid_topic`] and refuses
//! the names of tables the gateway owns itself. Values are always bound.

pub mod settings;
pub mod sqlite;

use crate::models::LogRecord;
use async_trait::async_trait;

pub use settings::SettingsStore;
pub use sqlite::SqliteLogStore;

/// Name of the reserved key/value table
pub const SETTINGS_TABLE: &str = "settings";

/// Storage faults
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid table identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("table name is reserved: {0}")]
    ReservedTable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Operations the ingestion pipeline and query surface need from a log store
///
/// Implementations must tolerate concurrent first writers to the same topic:
/// `create_topic_table` on a table that already exists succeeds.
#[async_trait]
pub trait LogStorage: Send + Sync {
    /// Whether `name` exists; storage faults report `false`
    async fn table_exists(&self, name: &str) -> bool;

    /// Create the table for a topic. "Already exists" is success.
    async fn create_topic_table(&self, name: &str) -> Result<(), StorageError>;

    /// Insert into an existing topic table and return the assigned id
    async fn insert(&self, table: &str, record: &LogRecord) -> Result<i64, StorageError>;

    /// All topic tables, excluding engine and reserved tables
    async fn list_topic_tables(&self) -> Result<Vec<String>, StorageError>;

    /// The `limit` most recently inserted rows, sorted by timestamp descending
    async fn list_recent(&self, table: &str, limit: u32) -> Result<Vec<LogRecord>, StorageError>;

    /// Exact lookup by id; `None` when absent
    async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<LogRecord>, StorageError>;

    /// Check-then-create. Not atomic, which `create_topic_table` makes harmless.
    async fn ensure_topic_table(&self, name: &str) -> Result<(), StorageError> {
        if self.table_exists(name).await {
            return Ok(());
        }
        self.create_topic_table(name).await
    }
}

/// Whether `name` belongs to the engine or to the gateway itself
///
/// SQLite identifiers are case-insensitive, so the comparison is too.
pub fn is_reserved_table(name: &str) -> bool {
    name.eq_ignore_ascii_case(SETTINGS_TABLE)
        || name.eq_ignore_ascii_case("_sqlx_migrations")
        || name
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"))
}

/// Validate a topic table name before it is interpolated into SQL
pub fn checked_table_name(name: &str) -> Result<&str, StorageError> {
    if !crate::topic::is_valid_topic(name) {
        return Err(StorageError::InvalidIdentifier(name.to_string()));
    }
    if is_reserved_table(name) {
        return Err(StorageError::ReservedTable(name.to_string()));
    }
    Ok(name)
}
