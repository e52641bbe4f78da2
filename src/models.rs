// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `ToSchema` for OpenAPI documentation.
//!
//! Addresses and wei amounts arrive as strings and are parsed here into the
//! core types, so malformed input is reported as a validation error rather
//! than a JSON decoding failure. Responses are flat objects; hashes,
//! signatures and raw transactions are `0x`-prefixed hex, and wei amounts
//! are decimal strings.

use std::collections::BTreeSet;

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::blockchain::{
    derivation, parse_address_list, parse_wei, transactions::parse_optional_wei, DataEncoding,
    TransactionRequest,
};
use crate::engine::{Balance, BroadcastReceipt, DeployRequest, SignedMessage, SignedOutput};
use crate::error::CustodyResult;
use crate::registry::{AccountPatch, NewAccount};
use crate::storage::AccountView;

// =============================================================================
// Accounts
// =============================================================================

/// Request to create (or import) an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    /// BIP-39 recovery phrase. Generated when omitted (create only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// Entropy of a generated phrase: 128, 160, 192, 224 or 256.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_bits: Option<usize>,
    /// BIP-44 address index (default 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Allowed destinations.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Denied destinations.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Enforce the whitelist. Defaults to true when a whitelist is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_whitelist: Option<bool>,
}

impl CreateAccountRequest {
    pub fn into_params(self) -> CustodyResult<NewAccount> {
        Ok(NewAccount {
            index: derivation::validate_index(self.index.unwrap_or(0))?,
            mnemonic: self.mnemonic.filter(|phrase| !phrase.trim().is_empty()),
            entropy_bits: self.entropy_bits,
            allow_list: address_set(&self.whitelist)?,
            deny_list: address_set(&self.blacklist)?,
            allow_list_enabled: self.enable_whitelist,
        })
    }
}

/// Policy update. Derivation parameters cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_whitelist: Option<bool>,
}

impl UpdateAccountRequest {
    pub fn into_patch(self) -> CustodyResult<AccountPatch> {
        Ok(AccountPatch {
            allow_list: self.whitelist.as_deref().map(address_set).transpose()?,
            deny_list: self.blacklist.as_deref().map(address_set).transpose()?,
            allow_list_enabled: self.enable_whitelist,
        })
    }
}

/// Account names in lexicographic order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<String>,
}

/// Created account. `mnemonic` is only present, once, when it was generated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountResponse {
    #[serde(flatten)]
    pub account: AccountView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteAccountResponse {
    pub name: String,
    pub message: String,
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    /// Destination address.
    pub to: String,
    /// Amount in wei, decimal or 0x-hex.
    pub amount: String,
    /// Gas limit; 21000 when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Gas price in wei; queried from the node when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

impl TransferRequest {
    pub fn into_request(self) -> CustodyResult<TransactionRequest> {
        Ok(TransactionRequest {
            to: Some(crate::blockchain::parse_address(&self.to)?),
            amount: parse_wei(&self.amount)?,
            gas_price: parse_optional_wei(self.gas_price.as_deref())?,
            gas_limit: self.gas_limit.unwrap_or(0),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignTransactionRequest {
    /// Destination address; omit to sign a contract creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Amount in wei (default 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Call data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Encoding of `data`: `utf8` (default) or `hex`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Nonce override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

impl SignTransactionRequest {
    pub fn into_request(self) -> CustodyResult<TransactionRequest> {
        let encoding: DataEncoding = self.encoding.as_deref().unwrap_or_default().parse()?;
        let data = match self.data.as_deref() {
            Some(data) => encoding.decode(data)?,
            None => Vec::new(),
        };

        Ok(TransactionRequest {
            to: self
                .to
                .as_deref()
                .map(crate::blockchain::parse_address)
                .transpose()?,
            amount: parse_optional_wei(self.amount.as_deref())?.unwrap_or(U256::ZERO),
            gas_price: parse_optional_wei(self.gas_price.as_deref())?,
            gas_limit: self.gas_limit.unwrap_or(0),
            data: data.into(),
            nonce: self.nonce,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignMessageRequest {
    pub message: String,
    /// Encoding of `message`: `utf8` (default) or `hex`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DeployContractRequest {
    /// Contract ABI (JSON text).
    pub abi: String,
    /// Compiled init code (hex).
    pub bin: String,
    /// Gas limit; estimated when omitted or 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

impl DeployContractRequest {
    pub fn into_request(self) -> CustodyResult<DeployRequest> {
        Ok(DeployRequest {
            abi: self.abi,
            bytecode: self.bin,
            gas_limit: self.gas_limit.unwrap_or(0),
            gas_price: parse_optional_wei(self.gas_price.as_deref())?,
        })
    }
}

/// Broadcast transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub tx_hash: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Value in wei
    pub amount: String,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Gas price in wei
    pub gas_price: String,
    /// Raw signed transaction
    pub signed_transaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

impl From<BroadcastReceipt> for TransactionResponse {
    fn from(receipt: BroadcastReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash.to_string(),
            from: receipt.from.to_string(),
            to: receipt.to.map(|to| to.to_string()),
            amount: receipt.value.to_string(),
            nonce: receipt.nonce,
            gas_limit: receipt.gas_limit,
            gas_price: receipt.gas_price.to_string(),
            signed_transaction: receipt.raw.to_string(),
            contract_address: receipt.contract_address.map(|a| a.to_string()),
        }
    }
}

/// Signed, not broadcast, transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignTransactionResponse {
    pub signed_transaction: String,
    pub tx_hash: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub amount: String,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: String,
    pub chain_id: u64,
    pub r: String,
    pub s: String,
    pub v: u64,
}

impl From<SignedOutput> for SignTransactionResponse {
    fn from(output: SignedOutput) -> Self {
        let SignedOutput { payload, signed } = output;
        Self {
            signed_transaction: signed.raw.to_string(),
            tx_hash: signed.hash.to_string(),
            from: payload.from.to_string(),
            to: payload.to.to().map(|to| to.to_string()),
            amount: payload.value.to_string(),
            nonce: payload.nonce,
            gas_limit: payload.gas_limit,
            gas_price: payload.gas_price.to_string(),
            chain_id: payload.chain_id,
            r: word(signed.r),
            s: word(signed.s),
            v: signed.v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignMessageResponse {
    pub address: String,
    /// 65-byte `r || s || v` signature
    pub signature: String,
    /// EIP-191 digest
    pub hash: String,
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl From<SignedMessage> for SignMessageResponse {
    fn from(signed: SignedMessage) -> Self {
        let sig = signed.signature;
        Self {
            address: signed.address.to_string(),
            signature: sig.signature.to_string(),
            hash: sig.hash.to_string(),
            r: word(sig.r),
            s: word(sig.s),
            v: sig.v,
        }
    }
}

// =============================================================================
// Balance
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Query this address instead of the account's own.
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,
    /// Balance in wei
    pub balance: String,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            address: balance.address.to_string(),
            balance: balance.wei.to_string(),
        }
    }
}

fn address_set(raw: &[String]) -> CustodyResult<BTreeSet<Address>> {
    Ok(parse_address_list(raw)?.into_iter().collect())
}

fn word(value: U256) -> String {
    B256::from(value).to_string()
}
