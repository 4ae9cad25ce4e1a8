//! Reserved key/value settings table
//!
//! Values are stored as JSON text so any serializable type round-trips.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

use super::StorageError;

#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    /// The `settings` table itself is created by migrations
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a setting, returning `default` when it is absent, undecodable or the read fails
    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get_raw(key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Stored setting is not valid for requested type");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to read setting");
                default
            }
        }
    }

    /// Raw JSON text of a setting
    async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = sqlx::query_scalar::<_, Option<String>>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.flatten())
    }

    /// Insert or replace a setting
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;

        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
