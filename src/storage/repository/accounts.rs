// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account repository on top of the secret store.
//!
//! ## Storage Layout
//!
//! Each account occupies two entries:
//! ```text
//! accounts/{name}   # Account record (JSON)
//! keys/{name}       # Private key (PKCS#8 PEM format)
//! ```
//!
//! ## Security
//!
//! - The private key lives under its own key and is never part of the record
//! - The recovery phrase is never stored
//! - Private keys are NEVER returned via API

use std::collections::BTreeSet;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{CustodyError, CustodyResult};
use crate::storage::{SecretStore, StoragePaths, ACCOUNTS_PREFIX};

/// Persisted account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account name
    pub name: String,
    /// BIP-44 address index the key was derived at
    pub index: u32,
    /// Address derived from (phrase, index)
    pub address: Address,
    /// Destinations this account may send to when the allow-list is enabled
    #[serde(default)]
    pub allow_list: BTreeSet<Address>,
    /// Destinations this account may never send to
    #[serde(default)]
    pub deny_list: BTreeSet<Address>,
    /// Whether `allow_list` is enforced
    #[serde(default)]
    pub allow_list_enabled: bool,
    /// Set once key material has been stored
    pub initialized: bool,
    /// Next nonce to use, once a broadcast through this service succeeded
    #[serde(default)]
    pub nonce: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response returned to API clients (never includes key material).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    /// Account name
    pub name: String,
    /// Public address
    #[schema(value_type = String)]
    pub address: Address,
    /// BIP-44 address index
    pub index: u32,
    /// Allowed destinations
    #[schema(value_type = Vec<String>)]
    pub whitelist: BTreeSet<Address>,
    /// Denied destinations
    #[schema(value_type = Vec<String>)]
    pub blacklist: BTreeSet<Address>,
    /// Whether the whitelist is enforced
    pub enable_whitelist: bool,
    /// Whether key material is present
    pub is_initialized: bool,
    /// Next locally tracked nonce, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            name: account.name,
            address: account.address,
            index: account.index,
            whitelist: account.allow_list,
            blacklist: account.deny_list,
            enable_whitelist: account.allow_list_enabled,
            is_initialized: account.initialized,
            nonce: account.nonce,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Repository for account records and their key material.
pub struct AccountRepository<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> AccountRepository<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Check if an account exists.
    pub async fn exists(&self, name: &str) -> CustodyResult<bool> {
        Ok(self.store.get(&StoragePaths::account(name)).await?.is_some())
    }

    /// Get an account record by name.
    pub async fn get(&self, name: &str) -> CustodyResult<Account> {
        let bytes = self
            .store
            .get(&StoragePaths::account(name))
            .await?
            .ok_or_else(|| CustodyError::NotFound(name.to_string()))?;
        let account = serde_json::from_slice(&bytes).map_err(crate::storage::StorageError::from)?;
        Ok(account)
    }

    /// Store a new account together with its key material.
    ///
    /// The key is written first so that a visible record always has a key.
    pub async fn create(&self, account: &Account, private_key_pem: &[u8]) -> CustodyResult<()> {
        if self.exists(&account.name).await? {
            return Err(CustodyError::Conflict(account.name.clone()));
        }

        self.store
            .put(&StoragePaths::account_key(&account.name), private_key_pem)
            .await?;
        self.write(account).await
    }

    /// Update an account record. Key material is left untouched.
    pub async fn update(&self, account: &Account) -> CustodyResult<()> {
        if !self.exists(&account.name).await? {
            return Err(CustodyError::NotFound(account.name.clone()));
        }
        self.write(account).await
    }

    /// Delete an account and its key material.
    ///
    /// **Warning**: This permanently deletes the private key.
    pub async fn delete(&self, name: &str) -> CustodyResult<()> {
        if !self.exists(name).await? {
            return Err(CustodyError::NotFound(name.to_string()));
        }

        self.store.delete(&StoragePaths::account(name)).await?;
        self.store.delete(&StoragePaths::account_key(name)).await?;
        Ok(())
    }

    /// List account names in lexicographic order.
    pub async fn list_names(&self) -> CustodyResult<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .list(ACCOUNTS_PREFIX)
            .await?
            .iter()
            .filter_map(|key| StoragePaths::account_name(key))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Read the private key for an account.
    ///
    /// **Internal use only** - for signing operations.
    /// NEVER expose this via API.
    pub(crate) async fn read_private_key(&self, name: &str) -> CustodyResult<Vec<u8>> {
        self.store
            .get(&StoragePaths::account_key(name))
            .await?
            .ok_or_else(|| CustodyError::crypto(format!("key material for {name} is absent")))
    }

    async fn write(&self, account: &Account) -> CustodyResult<()> {
        let json = serde_json::to_vec(account).map_err(crate::storage::StorageError::from)?;
        self.store
            .put(&StoragePaths::account(&account.name), &json)
            .await?;
        Ok(())
    }
}
