// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process chain client for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    rpc::types::TransactionRequest as CallRequest,
};
use async_trait::async_trait;

use crate::blockchain::{ChainClient, ChainClientError};

pub const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

/// Scriptable [`ChainClient`] that records every broadcast.
pub struct MockChainClient {
    pub chain_id: u64,
    pub pending_nonce: AtomicU64,
    pub balance: U256,
    pub gas_price: u128,
    pub estimate: u64,
    /// Reject every broadcast
    pub fail_broadcast: AtomicBool,
    /// Never answer any call
    pub stall: AtomicBool,
    pub sent: Mutex<Vec<Bytes>>,
    pub nonce_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub gas_price_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub broadcast_calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            pending_nonce: AtomicU64::new(0),
            balance: U256::from(5_000_000_000_000_000_000u64),
            gas_price: 2_000_000_000,
            estimate: 53_000,
            fail_broadcast: AtomicBool::new(false),
            stall: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            nonce_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            gas_price_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            broadcast_calls: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.nonce_calls,
            &self.balance_calls,
            &self.gas_price_calls,
            &self.estimate_calls,
            &self.broadcast_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    async fn enter(&self, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_nonce(&self, _address: Address) -> Result<u64, ChainClientError> {
        self.enter(&self.nonce_calls).await;
        Ok(self.pending_nonce.load(Ordering::SeqCst))
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, ChainClientError> {
        self.enter(&self.balance_calls).await;
        Ok(self.balance)
    }

    async fn suggest_gas_price(&self) -> Result<U256, ChainClientError> {
        self.enter(&self.gas_price_calls).await;
        Ok(U256::from(self.gas_price))
    }

    async fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, ChainClientError> {
        self.enter(&self.estimate_calls).await;
        Ok(self.estimate)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainClientError> {
        self.enter(&self.broadcast_calls).await;
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(ChainClientError::TransactionRejected("nonce too low".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Bytes::copy_from_slice(raw));
        }
        Ok(keccak256(raw))
    }
}
