// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain client seam and its JSON-RPC implementation.
//!
//! The custody core only needs five read/broadcast calls from a node. They
//! sit behind [`ChainClient`] so the engine can be driven by an in-process
//! double in tests and by [`RpcChainClient`] in production.

use std::future::Future;
use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest as CallRequest,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{CustodyError, CustodyResult};

/// Default per-call timeout for chain requests.
pub const DEFAULT_CHAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors that can occur talking to a node.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),
}

/// Node operations the custody core depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain identifier bound into every transaction signature.
    fn chain_id(&self) -> u64;

    /// Pending transaction count of `address`.
    async fn get_nonce(&self, address: Address) -> Result<u64, ChainClientError>;

    /// Native balance of `address` in wei.
    async fn get_balance(&self, address: Address) -> Result<U256, ChainClientError>;

    /// Gas price suggested by the node, in wei.
    async fn suggest_gas_price(&self) -> Result<U256, ChainClientError>;

    /// Gas estimate for a call or deployment.
    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainClientError>;

    /// Broadcast a signed, EIP-2718 encoded transaction.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainClientError>;
}

/// Cancellation and timeout scope for chain calls of one request.
///
/// Any call that is cancelled or exceeds the timeout fails with
/// [`CustodyError::ChainUnavailable`].
#[derive(Debug, Clone)]
pub struct ChainContext {
    cancel: CancellationToken,
    timeout: Duration,
}

impl Default for ChainContext {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_TIMEOUT)
    }
}

impl ChainContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_cancellation(CancellationToken::new(), timeout)
    }

    pub fn with_cancellation(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    /// Token that aborts every pending call of this context when cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one chain call under this context.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> CustodyResult<T>
    where
        F: Future<Output = Result<T, ChainClientError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(CustodyError::chain(format!("{operation} cancelled")));
        }

        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(CustodyError::chain(format!("{operation} cancelled")))
            }
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(CustodyError::chain(format!("{operation} failed: {e}"))),
                Err(_) => Err(CustodyError::chain(format!(
                    "{operation} timed out after {}ms",
                    self.timeout.as_millis()
                ))),
            },
        }
    }
}

/// JSON-RPC chain client.
pub struct RpcChainClient {
    chain_id: u64,
    provider: HttpProvider,
}

impl RpcChainClient {
    /// Connect to `rpc_url`. The chain id is queried from the node when not
    /// supplied.
    pub async fn connect(rpc_url: &str, chain_id: Option<u64>) -> Result<Self, ChainClientError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        let chain_id = match chain_id {
            Some(id) => id,
            None => provider
                .get_chain_id()
                .await
                .map_err(|e| ChainClientError::RpcError(e.to_string()))?,
        };

        Ok(Self { chain_id, provider })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, ChainClientError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ChainClientError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))
    }

    async fn suggest_gas_price(&self) -> Result<U256, ChainClientError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))?;
        Ok(U256::from(price))
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainClientError> {
        self.provider
            .estimate_gas(call.clone())
            .await
            .map_err(|e| ChainClientError::RpcError(format!("Gas estimation failed: {e}")))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainClientError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ChainClientError::TransactionRejected(e.to_string()))?;
        Ok(*pending.tx_hash())
    }
}
