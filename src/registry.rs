// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account lifecycle on top of the secret store.
//!
//! Every mutation of an account (create, update, delete, nonce advance)
//! happens while holding that account's lock, obtained through
//! [`AccountRegistry::lock`]. Reads take no lock.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::blockchain::{derivation, signing};
use crate::error::{CustodyError, CustodyResult};
use crate::storage::{Account, AccountRepository, SecretStore};

/// Longest accepted account name.
pub const MAX_NAME_LEN: usize = 128;

/// Parameters for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    /// Recovery phrase; a fresh one is generated when absent
    pub mnemonic: Option<String>,
    /// Entropy of a generated phrase
    pub entropy_bits: Option<usize>,
    pub index: u32,
    pub allow_list: BTreeSet<Address>,
    pub deny_list: BTreeSet<Address>,
    /// Defaults to "enabled when an allow-list is given"
    pub allow_list_enabled: Option<bool>,
}

/// Partial update of an account's policy.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub allow_list: Option<BTreeSet<Address>>,
    pub deny_list: Option<BTreeSet<Address>>,
    pub allow_list_enabled: Option<bool>,
}

/// A freshly stored account.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub account: Account,
    /// Generated recovery phrase; `None` when the caller supplied one
    pub mnemonic: Option<String>,
}

/// Check an account name: 1..=128 chars of `[A-Za-z0-9_.-]`.
pub fn validate_name(name: &str) -> CustodyResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(CustodyError::validation(format!(
            "Account name must be 1..={MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(CustodyError::validation(format!(
            "Account name `{name}` may only contain letters, digits, `_`, `.` and `-`"
        )));
    }
    Ok(())
}

/// Named accounts and their key material.
pub struct AccountRegistry {
    store: Arc<dyn SecretStore>,
    /// Live per-account locks; entries die with their last guard
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn repo(&self) -> AccountRepository<'_> {
        AccountRepository::new(self.store.as_ref())
    }

    /// Acquire the write lock of `name`.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| lock.strong_count() > 0);
            match locks.get(name).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(name.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Derive and store a new account.
    pub async fn create(&self, name: &str, params: NewAccount) -> CustodyResult<CreatedAccount> {
        validate_name(name)?;

        let supplied = params.mnemonic.filter(|phrase| !phrase.trim().is_empty());
        let (phrase, generated) = match supplied {
            Some(phrase) => (phrase, false),
            None => {
                let bits = params
                    .entropy_bits
                    .unwrap_or(derivation::DEFAULT_ENTROPY_BITS);
                (derivation::generate_phrase(bits)?, true)
            }
        };
        let key = derivation::derive(&phrase, params.index)?;
        let pem = key.private_key_pem()?;

        let _guard = self.lock(name).await;

        let now = Utc::now();
        let allow_list_enabled = params
            .allow_list_enabled
            .unwrap_or(!params.allow_list.is_empty());
        let account = Account {
            name: name.to_string(),
            index: params.index,
            address: key.address,
            allow_list: params.allow_list,
            deny_list: params.deny_list,
            allow_list_enabled,
            initialized: true,
            nonce: None,
            created_at: now,
            updated_at: now,
        };

        self.repo().create(&account, pem.as_bytes()).await?;

        info!(
            account = %account.name,
            address = %account.address,
            index = account.index,
            generated,
            "Account created"
        );

        Ok(CreatedAccount {
            account,
            mnemonic: generated.then_some(phrase),
        })
    }

    /// Store an account from an existing recovery phrase.
    pub async fn import(&self, name: &str, params: NewAccount) -> CustodyResult<Account> {
        if params.mnemonic.as_deref().is_none_or(|m| m.trim().is_empty()) {
            return Err(CustodyError::validation("A mnemonic is required to import an account"));
        }
        Ok(self.create(name, params).await?.account)
    }

    pub async fn read(&self, name: &str) -> CustodyResult<Account> {
        validate_name(name)?;
        self.repo().get(name).await
    }

    /// Apply a policy patch. Derivation parameters never change.
    pub async fn update(&self, name: &str, patch: AccountPatch) -> CustodyResult<Account> {
        validate_name(name)?;
        let _guard = self.lock(name).await;

        let mut account = self.repo().get(name).await?;
        if let Some(allow) = patch.allow_list {
            account.allow_list = allow;
        }
        if let Some(deny) = patch.deny_list {
            account.deny_list = deny;
        }
        if let Some(enabled) = patch.allow_list_enabled {
            account.allow_list_enabled = enabled;
        }
        account.updated_at = Utc::now();

        self.repo().update(&account).await?;
        info!(
            account = %name,
            whitelist = account.allow_list.len(),
            blacklist = account.deny_list.len(),
            enable_whitelist = account.allow_list_enabled,
            "Account updated"
        );
        Ok(account)
    }

    /// Remove an account and its key material.
    pub async fn delete(&self, name: &str) -> CustodyResult<()> {
        validate_name(name)?;
        let _guard = self.lock(name).await;

        self.repo().delete(name).await?;
        info!(account = %name, "Account deleted");
        Ok(())
    }

    /// Account names in lexicographic order.
    pub async fn list(&self) -> CustodyResult<Vec<String>> {
        self.repo().list_names().await
    }

    /// Load the signer of `account`, checking it still matches the address.
    pub async fn signer(&self, account: &Account) -> CustodyResult<PrivateKeySigner> {
        let pem = self.repo().read_private_key(&account.name).await?;
        let signer = signing::signer_from_pem(&pem)?;
        if signer.address() != account.address {
            return Err(CustodyError::crypto(format!(
                "Key material of {} does not match its address",
                account.name
            )));
        }
        Ok(signer)
    }

    /// Record that `used` was accepted by the chain.
    ///
    /// The caller must hold the account lock. The stored nonce never
    /// decreases.
    pub async fn commit_nonce(&self, account: &mut Account, used: u64) -> CustodyResult<()> {
        let next = used.saturating_add(1).max(account.nonce.unwrap_or(0));
        account.nonce = Some(next);
        account.updated_at = Utc::now();
        self.repo().update(account).await?;
        debug!(account = %account.name, nonce = next, "Nonce advanced");
        Ok(())
    }
}
