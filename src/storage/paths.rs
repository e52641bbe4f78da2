// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key layout for the secret store and the on-disk database location.

use std::path::{Path, PathBuf};

/// Default directory holding the secret database.
pub const DATA_ROOT: &str = "/data";

/// File name of the redb secret database inside the data directory.
pub const SECRETS_DB_FILE: &str = "secrets.redb";

/// Prefix of account records.
pub const ACCOUNTS_PREFIX: &str = "accounts/";

/// Prefix of private key blobs.
pub const KEYS_PREFIX: &str = "keys/";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb secret database.
    pub fn secrets_db(&self) -> PathBuf {
        self.root.join(SECRETS_DB_FILE)
    }

    // ========== Secret Store Keys ==========

    /// Key of an account record.
    pub fn account(name: &str) -> String {
        format!("{ACCOUNTS_PREFIX}{name}")
    }

    /// Key of an account's private key material.
    pub fn account_key(name: &str) -> String {
        format!("{KEYS_PREFIX}{name}")
    }

    /// Strip the account prefix from a listed key.
    pub fn account_name(key: &str) -> Option<&str> {
        key.strip_prefix(ACCOUNTS_PREFIX)
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}
