//! Persistent key-value storage and the favorites set built on top of it.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database Error: {0}")]
    Database(String),
    #[error("Serialization Error: {0}")]
    Serialization(String),
    #[error("Other Error: {0}")]
    Other(String),
}

/// Minimal persistent key-value contract the favorites set is written
/// against. Both operations may fail with a storage error.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let migrations = Migrations::new(vec![M::up(
        "CREATE TABLE IF NOT EXISTS kv (\
             key TEXT PRIMARY KEY,\
             value TEXT NOT NULL\
         );",
    )]);
    migrations
        .to_latest(conn)
        .map_err(|e| StoreError::Database(format!("Failed to apply migrations: {}", e)))
}

#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        let mut conn = Connection::open(db_path)
            .map_err(|e| StoreError::Database(format!("Failed to open database: {}", e)))?;
        apply_migrations(&mut conn)?;
        Ok(SqliteKvStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("Poisoned lock".into()))
    }

    pub fn get_sync(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| StoreError::Database(format!("Failed to read key {}: {}", key, e)))
    }

    pub fn set_sync(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| StoreError::Database(format!("Failed to write key {}: {}", key, e)))?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.get_sync(&key))
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let this = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || this.set_sync(&key, &value))
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?
    }
}

/// Storage key for the persisted favorites list.
pub const FAVORITES_KEY: &str = "favorites";

/// User-curated set of photo URIs, persisted as one JSON array.
///
/// Reads fail soft: a missing key, a storage error, or corrupted JSON all
/// degrade to the empty list with a warning, never an error surfaced to the
/// caller. Mutations serialize through one async mutex held across the
/// whole read-modify-write, so rapid concurrent toggles cannot lose
/// updates.
pub struct FavoritesStore<S: KvStore> {
    store: S,
    write_lock: tokio::sync::Mutex<()>,
}

impl<S: KvStore> FavoritesStore<S> {
    pub fn new(store: S) -> Self {
        FavoritesStore {
            store,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Favorites in insertion order. Missing key, storage failure, and
    /// parse failure all yield the empty list.
    pub async fn get(&self) -> Vec<String> {
        let raw = match self.store.get(FAVORITES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read favorites, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                // Corrupted data is dropped, not recovered.
                tracing::warn!(error = %e, "Corrupted favorites entry, treating as empty");
                Vec::new()
            }
        }
    }

    /// Favorites in display order: most recently added first.
    pub async fn display_order(&self) -> Vec<String> {
        let mut list = self.get().await;
        list.reverse();
        list
    }

    pub async fn contains(&self, uri: &str) -> bool {
        self.get().await.iter().any(|f| f == uri)
    }

    /// Append `uri` unless already present. Storage failure is logged and
    /// the list is left as it was.
    pub async fn add(&self, uri: &str) {
        let _guard = self.write_lock.lock().await;
        let mut list = self.get().await;
        if list.iter().any(|f| f == uri) {
            return;
        }
        list.push(uri.to_string());
        if let Err(e) = self.persist(&list).await {
            tracing::warn!(error = %e, uri, "Failed to persist favorite");
        }
    }

    /// Remove every entry equal to `uri`.
    pub async fn remove(&self, uri: &str) {
        let _guard = self.write_lock.lock().await;
        let mut list = self.get().await;
        let before = list.len();
        list.retain(|f| f != uri);
        if list.len() == before {
            return;
        }
        if let Err(e) = self.persist(&list).await {
            tracing::warn!(error = %e, uri, "Failed to persist favorite removal");
        }
    }

    /// Flip membership of `uri` and return the membership that is actually
    /// persisted afterwards: the new state on success, the prior state if
    /// the write failed.
    pub async fn toggle(&self, uri: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut list = self.get().await;
        let was_favorite = list.iter().any(|f| f == uri);
        if was_favorite {
            list.retain(|f| f != uri);
        } else {
            list.push(uri.to_string());
        }
        match self.persist(&list).await {
            Ok(()) => !was_favorite,
            Err(e) => {
                tracing::warn!(error = %e, uri, "Failed to persist favorite toggle");
                was_favorite
            }
        }
    }

    async fn persist(&self, list: &[String]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(list)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(FAVORITES_KEY, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn open_store() -> (NamedTempFile, SqliteKvStore) {
        let tmp = NamedTempFile::new().expect("create temp file");
        let store = SqliteKvStore::new(tmp.path()).expect("create kv store");
        (tmp, store)
    }

    #[test]
    fn test_kv_store_new_invalid_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let result = SqliteKvStore::new(dir.path());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_kv_roundtrip_and_overwrite() {
        let (_tmp, store) = open_store();
        assert_eq!(store.get("missing").await.unwrap(), None);
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_get_parses_stored_list() {
        let (_tmp, store) = open_store();
        store.set(FAVORITES_KEY, r#"["a","b"]"#).await.unwrap();
        let favorites = FavoritesStore::new(store);
        assert_eq!(favorites.get().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let (_tmp, store) = open_store();
        let favorites = FavoritesStore::new(store);
        assert!(favorites.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_empty() {
        let (_tmp, store) = open_store();
        store.set(FAVORITES_KEY, "not json").await.unwrap();
        let favorites = FavoritesStore::new(store);
        assert!(favorites.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_appends_and_ignores_duplicates() {
        let (_tmp, store) = open_store();
        store.set(FAVORITES_KEY, r#"["a","b"]"#).await.unwrap();
        let favorites = FavoritesStore::new(store.clone());

        favorites.add("c").await;
        assert_eq!(
            store.get(FAVORITES_KEY).await.unwrap().unwrap(),
            r#"["a","b","c"]"#
        );

        favorites.add("b").await;
        assert_eq!(
            store.get(FAVORITES_KEY).await.unwrap().unwrap(),
            r#"["a","b","c"]"#
        );
    }

    #[tokio::test]
    async fn test_toggle_is_its_own_inverse() {
        let (_tmp, store) = open_store();
        let favorites = FavoritesStore::new(store);
        favorites.add("a").await;

        assert!(favorites.toggle("b").await);
        assert_eq!(favorites.get().await, vec!["a", "b"]);
        assert!(!favorites.toggle("b").await);
        assert_eq!(favorites.get().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_display_order_is_reversed() {
        let (_tmp, store) = open_store();
        let favorites = FavoritesStore::new(store);
        favorites.add("a").await;
        favorites.add("b").await;
        favorites.add("c").await;
        assert_eq!(favorites.display_order().await, vec!["c", "b", "a"]);
        // Storage order stays insertion order.
        assert_eq!(favorites.get().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_do_not_lose_updates() {
        let (_tmp, store) = open_store();
        let favorites = Arc::new(FavoritesStore::new(store));

        let mut handles = Vec::new();
        for i in 0..16 {
            let favorites = Arc::clone(&favorites);
            handles.push(tokio::spawn(async move {
                favorites.toggle(&format!("uri-{}", i)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        let mut list = favorites.get().await;
        list.sort();
        assert_eq!(list.len(), 16);
    }
}
