// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM integration.
//!
//! This module provides functionality for:
//! - Deriving signing keys from BIP-39 recovery phrases
//! - Assembling legacy transactions from requests and chain state
//! - Signing transactions (EIP-155) and personal messages (EIP-191)
//! - Talking to a node through the [`ChainClient`] seam

pub mod client;
pub mod derivation;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{ChainClient, ChainClientError, ChainContext, RpcChainClient};
pub use derivation::{derive, generate_phrase, validate_index, DerivedKey};
pub use signing::{sign_message, sign_transaction, MessageSignature, SignedTransaction};
pub use transactions::{parse_wei, SignablePayload, TransactionBuilder, TransactionRequest};
pub use types::*;
