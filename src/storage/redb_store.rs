// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `secrets`: key → opaque bytes
//!
//! redb is synchronous; every call runs on the blocking thread pool so the
//! async request path never stalls on disk I/O.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, TableDefinition};

use super::{SecretStore, StorageError, StorageResult};

/// Single table holding every secret-store entry.
const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

/// Embedded ACID [`SecretStore`].
#[derive(Clone)]
pub struct RedbSecretStore {
    db: Arc<Database>,
}

impl RedbSecretStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SECRETS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_blocking(db: &Database, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;
        Ok(table.get(key)?.map(|value| value.value().to_vec()))
    }

    fn put_blocking(db: &Database, key: &str, value: &[u8]) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_blocking(db: &Database, prefix: &str) -> StorageResult<Vec<String>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;

        let mut keys = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, _) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    fn delete_blocking(db: &Database, key: &str) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn run<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl SecretStore for RedbSecretStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(move |db| Self::get_blocking(db, &key)).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.run(move |db| Self::put_blocking(db, &key, &value)).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.run(move |db| Self::list_blocking(db, &prefix)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.run(move |db| Self::delete_blocking(db, &key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RedbSecretStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbSecretStore::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn put_and_get() {
        let (store, _dir) = temp_store();
        store.put("keys/alice", b"pem").await.unwrap();

        assert_eq!(store.get("keys/alice").await.unwrap(), Some(b"pem".to_vec()));
        assert_eq!(store.get("keys/bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_returns_prefixed_keys_sorted() {
        let (store, _dir) = temp_store();
        for key in ["accounts/zed", "accounts/amy", "keys/amy", "accountsx"] {
            store.put(key, b"v").await.unwrap();
        }

        let keys = store.list("accounts/").await.unwrap();
        assert_eq!(keys, vec!["accounts/amy", "accounts/zed"]);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (store, _dir) = temp_store();
        store.put("accounts/amy", b"v").await.unwrap();
        store.delete("accounts/amy").await.unwrap();

        assert_eq!(store.get("accounts/amy").await.unwrap(), None);
        assert!(store.list("accounts/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.redb");
        {
            let store = RedbSecretStore::open(&path).unwrap();
            store.put("accounts/amy", b"v").await.unwrap();
        }
        let store = RedbSecretStore::open(&path).unwrap();
        assert_eq!(store.get("accounts/amy").await.unwrap(), Some(b"v".to_vec()));
    }
}
