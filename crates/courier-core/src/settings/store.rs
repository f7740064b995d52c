//! Settings persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::Result;

/// Namespaced JSON settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Loads the value stored under `namespace`, if any.
    async fn load(&self, namespace: &str) -> Result<Option<Value>>;

    /// Replaces the value stored under `namespace`.
    async fn save(&self, namespace: &str, value: &Value) -> Result<()>;
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettingsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one namespace.
    #[must_use]
    pub fn with(namespace: impl Into<String>, value: Value) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.into(), value);
        store
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, namespace: &str) -> Result<Option<Value>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(namespace).cloned())
    }

    async fn save(&self, namespace: &str, value: &Value) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), value.clone());
        Ok(())
    }
}

/// Settings store backed by `SQLite`.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS settings (
                namespace TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self, namespace: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM settings WHERE namespace = ?")
            .bind(namespace)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, namespace: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO settings (namespace, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(namespace) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(namespace)
        .bind(&raw)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(namespace, "Saved settings");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySettingsStore::new();
        assert!(store.load("email").await.unwrap().is_none());

        store.save("email", &json!({"protocol": "smtp"})).await.unwrap();
        assert_eq!(
            store.load("email").await.unwrap(),
            Some(json!({"protocol": "smtp"}))
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_upsert() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        assert!(store.load("email").await.unwrap().is_none());

        store.save("email", &json!({"host": "a"})).await.unwrap();
        store.save("email", &json!({"host": "b"})).await.unwrap();
        store.save("general", &json!({"siteName": "Acme"})).await.unwrap();

        assert_eq!(store.load("email").await.unwrap(), Some(json!({"host": "b"})));
        assert_eq!(
            store.load("general").await.unwrap(),
            Some(json!({"siteName": "Acme"}))
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        let path = path.to_str().unwrap();

        SqliteSettingsStore::new(path)
            .await
            .unwrap()
            .save("email", &json!({"port": 25}))
            .await
            .unwrap();

        let reopened = SqliteSettingsStore::new(path).await.unwrap();
        assert_eq!(reopened.load("email").await.unwrap(), Some(json!({"port": 25})));
    }
}
