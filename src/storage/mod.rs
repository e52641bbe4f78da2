// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Storage Module
//!
//! The custody core never talks to a concrete database. It receives a
//! [`SecretStore`] at construction time and uses it as an opaque key/value
//! store with ordered prefix listing.
//!
//! ## Storage Layout
//!
//! ```text
//! accounts/{name}   # Account record (JSON, public fields + nonce)
//! keys/{name}       # Private key (PKCS#8 PEM, NEVER exposed via API)
//! ```
//!
//! ## Backends
//!
//! - [`RedbSecretStore`]: embedded ACID database, used in production
//! - [`InMemorySecretStore`]: process-local map, used in tests and dev runs

use async_trait::async_trait;

pub mod memory;
pub mod paths;
pub mod redb_store;
pub mod repository;

pub use memory::InMemorySecretStore;
pub use paths::{StoragePaths, ACCOUNTS_PREFIX};
pub use redb_store::RedbSecretStore;
pub use repository::{Account, AccountRepository, AccountView};

/// Error type for secret storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Opaque secret store with ordered prefix listing.
///
/// `get` returns `Ok(None)` for a missing key. `list` returns the full keys
/// that start with `prefix`, in ascending byte order.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    async fn delete(&self, key: &str) -> StorageResult<()>;
}
