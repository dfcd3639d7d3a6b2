//! # Durable Local Store
//!
//! Key-based persistent storage that survives process restart. Holds the
//! offline action queue, the per-conversation message cache, the conversation
//! and document list caches, the user profile, settings, and sync metadata.
//!
//! ## Design
//!
//! A single SQLite table maps namespaced keys to JSON values. `INSERT OR
//! REPLACE` makes each key's write atomic from the caller's perspective: a
//! concurrent read sees either the previous value or the new one, never a
//! partial value. There is no cross-key transactionality and none is needed;
//! callers that read-modify-write a key re-read it fresh rather than reusing
//! a value captured before an await point.
//!
//! Corrupt cached JSON is treated as absent: [`DurableStore::load`] logs a
//! warning and returns the caller's default instead of propagating a parse
//! error. A broken cache must never take the application down.

pub mod cache;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::Result;
use crate::ids::ConversationId;

/// Namespaced storage keys, one per logical domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKey {
    /// The persisted offline action queue.
    OfflineQueue,
    /// Message cache for one conversation.
    Messages(ConversationId),
    /// Cached conversation list.
    Conversations,
    /// Cached uploaded-document records.
    Documents,
    /// Cached user profile.
    UserProfile,
    /// Client settings.
    Settings,
    /// Timestamp of the last successful sync pass.
    LastSync,
}

impl StoreKey {
    /// The string form used as the SQLite primary key.
    pub fn name(&self) -> String {
        match self {
            StoreKey::OfflineQueue => "offline_queue".to_string(),
            StoreKey::Messages(id) => format!("messages:{id}"),
            StoreKey::Conversations => "conversations".to_string(),
            StoreKey::Documents => "documents".to_string(),
            StoreKey::UserProfile => "user_profile".to_string(),
            StoreKey::Settings => "settings".to_string(),
            StoreKey::LastSync => "last_sync".to_string(),
        }
    }
}

/// The durable key-value store.
#[derive(Debug, Clone)]
pub struct DurableStore {
    pool: SqlitePool,
}

impl DurableStore {
    /// Open (or create) the store at the platform data directory.
    pub async fn open() -> Result<Self> {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("policychat");
        if let Err(err) = std::fs::create_dir_all(&path) {
            warn!(error = %err, "could not create data directory, falling back to temp");
            path = std::env::temp_dir();
        }
        path.push("local.db");
        Self::open_at(&path).await
    }

    /// Open (or create) the store at an explicit path.
    pub async fn open_at(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a JSON-serializable value under `key`, replacing any previous
    /// value atomically.
    pub async fn save<T: Serialize>(&self, key: &StoreKey, value: &T) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind(key.name())
        .bind(serialized)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load the value saved under `key`, or `default` when the key is absent
    /// or its value does not parse. Never fails: a corrupt or unreadable
    /// entry degrades to the default with a log line.
    pub async fn load<T: DeserializeOwned>(&self, key: &StoreKey, default: T) -> T {
        let row = match sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key.name())
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                warn!(key = %key.name(), error = %err, "store read failed, using default");
                return default;
            }
        };

        let Some(row) = row else {
            return default;
        };
        let raw: String = match row.try_get("value") {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key.name(), error = %err, "store row unreadable, using default");
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key.name(), error = %err, "corrupt cached value, using default");
                default
            }
        }
    }

    /// Remove the value saved under `key`, if any.
    pub async fn remove(&self, key: &StoreKey) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key.name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Wipe every namespaced key (queue, caches, profile, settings, sync
    /// metadata). Used on sign-out.
    pub async fn clear_offline_data(&self) -> Result<()> {
        sqlx::query("DELETE FROM kv_store").execute(&self.pool).await?;
        Ok(())
    }
}
