//! Local storage repository
//!
//! Raw string slots keyed by name. JSON encoding happens one layer up.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

use crate::db::Database;

/// A stored slot
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for local storage slots
#[async_trait]
pub trait LocalStorageRepository: Send + Sync {
    /// Get a slot by key
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Insert or overwrite a slot
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLx-based local storage repository
pub struct SqlxLocalStorageRepository {
    db: Database,
}

impl SqlxLocalStorageRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn boxed(db: Database) -> Arc<dyn LocalStorageRepository> {
        Arc::new(Self::new(db))
    }
}

#[async_trait]
impl LocalStorageRepository for SqlxLocalStorageRepository {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await
            .with_context(|| format!("Failed to read local storage key {}", key))?;

        Ok(row.map(|r| StoredEntry {
            key: r.get("key"),
            value: r.get("value"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .with_context(|| format!("Failed to write local storage key {}", key))?;
        Ok(())
    }
}
