// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction assembly.
//!
//! [`TransactionBuilder`] turns a user request into a fully resolved
//! [`SignablePayload`]: the destination policy is checked first, then the
//! missing gas price, gas limit and nonce are filled in from the account
//! record or the chain client.

use alloy::{
    consensus::TxLegacy,
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::{TransactionInput, TransactionRequest as CallRequest},
};

use super::client::{ChainClient, ChainContext};
use super::types::DEFAULT_GAS_LIMIT;
use crate::error::{CustodyError, CustodyResult};
use crate::policy;
use crate::storage::Account;

/// A transaction as requested by a caller, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    /// Destination; `None` creates a contract
    pub to: Option<Address>,
    /// Value in wei
    pub amount: U256,
    /// Gas price in wei; queried from the node when absent
    pub gas_price: Option<U256>,
    /// Gas limit; 0 means "pick one"
    pub gas_limit: u64,
    /// Call data or init code
    pub data: Bytes,
    /// Explicit nonce, overriding the tracked one
    pub nonce: Option<u64>,
}

/// Fully resolved legacy transaction plus its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignablePayload {
    pub from: Address,
    pub to: TxKind,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub nonce: u64,
    pub chain_id: u64,
    pub input: Bytes,
}

impl SignablePayload {
    /// Legacy transaction with the chain id set, so signing applies EIP-155.
    pub fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            input: self.input.clone(),
        }
    }
}

/// Resolves [`TransactionRequest`]s against an account and the chain.
pub struct TransactionBuilder<'a> {
    chain: &'a dyn ChainClient,
    ctx: &'a ChainContext,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(chain: &'a dyn ChainClient, ctx: &'a ChainContext) -> Self {
        Self { chain, ctx }
    }

    /// Build a signable payload for `account`.
    ///
    /// A denied destination fails before any chain call is made.
    pub async fn build(
        &self,
        account: &Account,
        request: &TransactionRequest,
    ) -> CustodyResult<SignablePayload> {
        match request.to {
            Some(to) => policy::validate(account, &to)?,
            None => policy::validate_creation(account, request.amount)?,
        }

        let gas_price = match request.gas_price {
            Some(price) => price,
            None => {
                self.ctx
                    .run("eth_gasPrice", self.chain.suggest_gas_price())
                    .await?
            }
        };
        let gas_price: u128 = gas_price
            .try_into()
            .map_err(|_| CustodyError::validation(format!("Gas price {gas_price} out of range")))?;

        let to = request.to.map_or(TxKind::Create, TxKind::Call);

        let gas_limit = if request.gas_limit > 0 {
            request.gas_limit
        } else if request.to.is_some() && request.data.is_empty() {
            DEFAULT_GAS_LIMIT
        } else {
            let call = CallRequest {
                from: Some(account.address),
                to: Some(to),
                value: Some(request.amount),
                gas_price: Some(gas_price),
                input: TransactionInput::new(request.data.clone()),
                ..Default::default()
            };
            self.ctx
                .run("eth_estimateGas", self.chain.estimate_gas(&call))
                .await?
        };

        // Signed-only transactions may be broadcast elsewhere, so the
        // stored nonce is a floor, not the answer.
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => {
                let pending = self
                    .ctx
                    .run("eth_getTransactionCount", self.chain.get_nonce(account.address))
                    .await?;
                account.nonce.map_or(pending, |stored| stored.max(pending))
            }
        };

        Ok(SignablePayload {
            from: account.address,
            to,
            value: request.amount,
            gas_price,
            gas_limit,
            nonce,
            chain_id: self.chain.chain_id(),
            input: request.data.clone(),
        })
    }
}

/// Parse a wei amount given as decimal or `0x`-prefixed hex.
pub fn parse_wei(raw: &str) -> CustodyResult<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CustodyError::validation("Amount must not be empty"));
    }
    if raw.starts_with('-') {
        return Err(CustodyError::validation(format!("Amount must not be negative: `{raw}`")));
    }

    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16),
        Some(_) => return Err(CustodyError::validation("Amount `0x` has no digits")),
        None => U256::from_str_radix(raw, 10),
    };
    parsed.map_err(|e| CustodyError::validation(format!("Invalid amount `{raw}`: {e}")))
}

/// Parse an optional wei amount; blank means absent.
pub fn parse_optional_wei(raw: Option<&str>) -> CustodyResult<Option<U256>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_wei(value).map(Some),
    }
}
