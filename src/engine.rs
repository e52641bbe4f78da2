// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custody Engine
//!
//! Request/response pipeline that wires the account registry, the
//! destination policy, the transaction builder and the signer to the two
//! injected collaborators (secret store and chain client).
//!
//! Broadcasting operations run entirely under the account lock:
//!
//! ```text
//! lock → load account → policy → gas / nonce → sign → broadcast → commit nonce
//! ```
//!
//! The nonce is committed only after the chain client accepted the raw
//! transaction. Any earlier failure leaves the stored account untouched, so
//! a retry reuses the same nonce.

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, Bytes, B256, U256},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::blockchain::{
    client::DEFAULT_CHAIN_TIMEOUT, signing, ChainClient, ChainContext,
    DataEncoding, MessageSignature, SignablePayload, SignedTransaction, TransactionBuilder,
    TransactionRequest,
};
use crate::error::{CustodyError, CustodyResult};
use crate::registry::{validate_name, AccountPatch, AccountRegistry, CreatedAccount, NewAccount};
use crate::storage::{Account, SecretStore};

/// Outcome of a broadcast accepted by the chain client.
#[derive(Debug, Clone)]
pub struct BroadcastReceipt {
    pub tx_hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    /// Signed transaction as sent
    pub raw: Bytes,
    /// Address of the created contract, for deployments
    pub contract_address: Option<Address>,
}

/// A transaction signed but not broadcast.
#[derive(Debug, Clone)]
pub struct SignedOutput {
    pub payload: SignablePayload,
    pub signed: SignedTransaction,
}

/// A personal-message signature and the address that produced it.
#[derive(Debug, Clone)]
pub struct SignedMessage {
    pub address: Address,
    pub signature: MessageSignature,
}

/// Native balance of an address.
#[derive(Debug, Clone, Copy)]
pub struct Balance {
    pub address: Address,
    pub wei: U256,
}

/// Whose balance to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceTarget {
    Account(String),
    Address(Address),
}

/// Compiled contract to deploy.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Contract ABI as JSON
    pub abi: String,
    /// Init code as hex
    pub bytecode: String,
    /// 0 means "estimate"
    pub gas_limit: u64,
    pub gas_price: Option<U256>,
}

/// The custody core.
pub struct CustodyEngine {
    registry: AccountRegistry,
    chain: Arc<dyn ChainClient>,
    chain_timeout: Duration,
    shutdown: CancellationToken,
}

impl CustodyEngine {
    pub fn new(store: Arc<dyn SecretStore>, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            registry: AccountRegistry::new(store),
            chain,
            chain_timeout: DEFAULT_CHAIN_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    /// Per-call timeout for chain requests.
    pub fn with_chain_timeout(mut self, timeout: Duration) -> Self {
        self.chain_timeout = timeout;
        self
    }

    /// Token whose cancellation aborts all in-flight chain calls.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    /// Fresh chain context for one request.
    pub fn context(&self) -> ChainContext {
        ChainContext::with_cancellation(self.shutdown.child_token(), self.chain_timeout)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn list_accounts(&self) -> CustodyResult<Vec<String>> {
        self.registry.list().await
    }

    pub async fn create_account(
        &self,
        name: &str,
        params: NewAccount,
    ) -> CustodyResult<CreatedAccount> {
        self.registry.create(name, params).await
    }

    pub async fn import_account(&self, name: &str, params: NewAccount) -> CustodyResult<Account> {
        self.registry.import(name, params).await
    }

    pub async fn read_account(&self, name: &str) -> CustodyResult<Account> {
        self.registry.read(name).await
    }

    pub async fn update_account(&self, name: &str, patch: AccountPatch) -> CustodyResult<Account> {
        self.registry.update(name, patch).await
    }

    pub async fn delete_account(&self, name: &str) -> CustodyResult<()> {
        self.registry.delete(name).await
    }

    // =========================================================================
    // Chain operations
    // =========================================================================

    /// Send value to `request.to` and broadcast it.
    pub async fn transfer(
        &self,
        name: &str,
        request: TransactionRequest,
    ) -> CustodyResult<BroadcastReceipt> {
        if request.to.is_none() {
            return Err(CustodyError::validation("Transfer requires a destination"));
        }
        self.broadcast(name, request).await
    }

    /// Balance of an account or of a raw address.
    pub async fn balance(&self, target: BalanceTarget) -> CustodyResult<Balance> {
        let address = match target {
            BalanceTarget::Account(name) => self.registry.read(&name).await?.address,
            BalanceTarget::Address(address) => address,
        };

        let wei = self
            .context()
            .run("eth_getBalance", self.chain.get_balance(address))
            .await?;
        Ok(Balance { address, wei })
    }

    /// Sign a transaction without broadcasting it. The stored nonce is not
    /// advanced.
    pub async fn sign_transaction(
        &self,
        name: &str,
        request: TransactionRequest,
    ) -> CustodyResult<SignedOutput> {
        let account = self.registry.read(name).await?;
        ensure_initialized(&account)?;

        let ctx = self.context();
        let payload = TransactionBuilder::new(self.chain.as_ref(), &ctx)
            .build(&account, &request)
            .await?;
        let signer = self.registry.signer(&account).await?;
        let signed = signing::sign_transaction(&signer, &payload)?;

        info!(account = %name, nonce = payload.nonce, tx_hash = %signed.hash, "Transaction signed");
        Ok(SignedOutput { payload, signed })
    }

    /// Sign an EIP-191 personal message.
    pub async fn sign_message(
        &self,
        name: &str,
        message: &str,
        encoding: DataEncoding,
    ) -> CustodyResult<SignedMessage> {
        let bytes = encoding.decode(message)?;
        let account = self.registry.read(name).await?;
        ensure_initialized(&account)?;

        let signer = self.registry.signer(&account).await?;
        let signature = signing::sign_message(&signer, &bytes)?;

        info!(account = %name, len = bytes.len(), "Message signed");
        Ok(SignedMessage {
            address: account.address,
            signature,
        })
    }

    /// Deploy compiled contract code from the account.
    pub async fn deploy_contract(
        &self,
        name: &str,
        deploy: DeployRequest,
    ) -> CustodyResult<BroadcastReceipt> {
        let abi: JsonAbi = serde_json::from_str(&deploy.abi)
            .map_err(|e| CustodyError::validation(format!("Invalid ABI: {e}")))?;
        if abi.constructor.as_ref().is_some_and(|c| !c.inputs.is_empty()) {
            return Err(CustodyError::validation(
                "Constructors with arguments are not supported",
            ));
        }

        let code = DataEncoding::Hex.decode(&deploy.bytecode)?;
        if code.is_empty() {
            return Err(CustodyError::validation("Contract bytecode must not be empty"));
        }

        let request = TransactionRequest {
            to: None,
            amount: U256::ZERO,
            gas_price: deploy.gas_price,
            gas_limit: deploy.gas_limit,
            data: code.into(),
            nonce: None,
        };
        self.broadcast(name, request).await
    }

    async fn broadcast(
        &self,
        name: &str,
        request: TransactionRequest,
    ) -> CustodyResult<BroadcastReceipt> {
        validate_name(name)?;
        let _guard = self.registry.lock(name).await;

        let mut account = self.registry.read(name).await?;
        ensure_initialized(&account)?;

        let ctx = self.context();
        let payload = TransactionBuilder::new(self.chain.as_ref(), &ctx)
            .build(&account, &request)
            .await?;
        let signer = self.registry.signer(&account).await?;
        let signed = signing::sign_transaction(&signer, &payload)?;

        let tx_hash = match ctx
            .run("eth_sendRawTransaction", self.chain.send_raw_transaction(&signed.raw))
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                warn!(account = %name, nonce = payload.nonce, error = %e, "Broadcast failed");
                return Err(e);
            }
        };

        // The transaction is already out; a later build resyncs from the
        // chain's pending nonce.
        if let Err(e) = self.registry.commit_nonce(&mut account, payload.nonce).await {
            warn!(
                account = %name,
                nonce = payload.nonce,
                tx_hash = %tx_hash,
                error = %e,
                "Broadcast accepted but nonce not persisted"
            );
        }

        let contract_address = request.to.is_none().then(|| account.address.create(payload.nonce));
        info!(
            account = %name,
            to = ?request.to,
            nonce = payload.nonce,
            tx_hash = %tx_hash,
            "Transaction broadcast"
        );

        Ok(BroadcastReceipt {
            tx_hash,
            from: account.address,
            to: request.to,
            value: payload.value,
            nonce: payload.nonce,
            gas_limit: payload.gas_limit,
            gas_price: payload.gas_price,
            raw: signed.raw,
            contract_address,
        })
    }
}

fn ensure_initialized(account: &Account) -> CustodyResult<()> {
    if account.initialized {
        Ok(())
    } else {
        Err(CustodyError::crypto(format!(
            "Account {} has no key material",
            account.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{derivation, parse_wei};
    use crate::storage::{InMemorySecretStore, StorageError, StorageResult};
    use crate::testing::{MockChainClient, TEST_PHRASE};
    use alloy::{
        consensus::TxEnvelope,
        eips::eip2718::Decodable2718,
        primitives::{address, eip191_hash_message},
    };
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    const BOB: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const CAROL: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    const EMPTY_ABI: &str = r#"[{"type":"constructor","inputs":[],"stateMutability":"nonpayable"}]"#;

    fn setup(chain_id: u64) -> (Arc<MockChainClient>, CustodyEngine) {
        let chain = Arc::new(MockChainClient::new(chain_id));
        let engine = CustodyEngine::new(Arc::new(InMemorySecretStore::new()), chain.clone());
        (chain, engine)
    }

    fn one_ether(to: Address) -> TransactionRequest {
        TransactionRequest {
            to: Some(to),
            amount: parse_wei("1000000000000000000").unwrap(),
            ..Default::default()
        }
    }

    async fn import(engine: &CustodyEngine, name: &str) -> Account {
        engine
            .import_account(
                name,
                NewAccount {
                    mnemonic: Some(TEST_PHRASE.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn created_account_is_recoverable_from_phrase() {
        let (_, engine) = setup(1);
        let created = engine
            .create_account("alice", NewAccount::default())
            .await
            .unwrap();

        let phrase = created.mnemonic.unwrap();
        let rederived = derivation::derive(&phrase, 0).unwrap();
        assert_eq!(rederived.address, created.account.address);
        assert_eq!(engine.list_accounts().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn denied_transfer_keeps_nonce() {
        let (chain, engine) = setup(1);
        import(&engine, "alice").await;
        engine
            .update_account(
                "alice",
                AccountPatch {
                    deny_list: Some(BTreeSet::from([BOB])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = engine.transfer("alice", one_ether(BOB)).await.unwrap_err();
        assert_eq!(err.kind(), "access_denied");
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, None);
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn transfer_resolves_defaults_and_advances_nonce() {
        let (chain, engine) = setup(31337);
        chain.pending_nonce.store(7, Ordering::SeqCst);
        let account = import(&engine, "alice").await;

        let receipt = engine.transfer("alice", one_ether(CAROL)).await.unwrap();

        assert_eq!(receipt.gas_limit, 21_000);
        assert_eq!(receipt.nonce, 7);
        assert_eq!(receipt.from, account.address);
        assert_eq!(receipt.tx_hash, alloy::primitives::keccak256(&receipt.raw));
        assert_eq!(chain.sent(), vec![receipt.raw.clone()]);
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, Some(8));

        let envelope = TxEnvelope::decode_2718(&mut receipt.raw.as_ref()).unwrap();
        assert_eq!(*envelope.tx_hash(), receipt.tx_hash);
    }

    #[tokio::test]
    async fn signed_message_recovers_to_account() {
        let (_, engine) = setup(1);
        let account = import(&engine, "alice").await;

        let signed = engine
            .sign_message("alice", "hello", DataEncoding::Utf8)
            .await
            .unwrap();
        assert_eq!(signed.address, account.address);
        assert_eq!(signed.signature.hash, eip191_hash_message(b"hello"));

        let recovered =
            signing::recover_message_signer(b"hello", &signed.signature.signature).unwrap();
        assert_eq!(recovered, account.address);

        let hex = engine
            .sign_message("alice", "0x68656c6c6f", DataEncoding::Hex)
            .await
            .unwrap();
        assert_eq!(hex.signature.signature, signed.signature.signature);
    }

    #[tokio::test]
    async fn concurrent_transfers_use_contiguous_nonces() {
        let (chain, engine) = setup(1);
        chain.pending_nonce.store(3, Ordering::SeqCst);
        import(&engine, "alice").await;
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.transfer("alice", one_ether(CAROL)).await })
            })
            .collect();

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap().unwrap().nonce);
        }
        nonces.sort_unstable();

        assert_eq!(nonces, (3..11).collect::<Vec<u64>>());
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, Some(11));
        assert_eq!(chain.sent().len(), 8);
    }

    #[tokio::test]
    async fn failed_broadcast_keeps_nonce() {
        let (chain, engine) = setup(1);
        import(&engine, "alice").await;
        chain.fail_broadcast.store(true, Ordering::SeqCst);

        let err = engine.transfer("alice", one_ether(CAROL)).await.unwrap_err();
        assert_eq!(err.kind(), "chain_unavailable");
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, None);

        chain.fail_broadcast.store(false, Ordering::SeqCst);
        let receipt = engine.transfer("alice", one_ether(CAROL)).await.unwrap();
        assert_eq!(receipt.nonce, 0);
    }

    #[tokio::test]
    async fn stalled_chain_times_out() {
        let (chain, engine) = setup(1);
        let engine = engine.with_chain_timeout(Duration::from_millis(30));
        import(&engine, "alice").await;
        chain.stall.store(true, Ordering::SeqCst);

        let err = engine.transfer("alice", one_ether(CAROL)).await.unwrap_err();
        assert!(matches!(err, CustodyError::ChainUnavailable(_)));
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, None);

        let err = engine
            .balance(BalanceTarget::Account("alice".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "chain_unavailable");
    }

    #[tokio::test]
    async fn shutdown_cancels_chain_calls() {
        let chain = Arc::new(MockChainClient::new(1));
        let shutdown = CancellationToken::new();
        let engine = CustodyEngine::new(Arc::new(InMemorySecretStore::new()), chain.clone())
            .with_shutdown(shutdown.clone());
        import(&engine, "alice").await;

        shutdown.cancel();
        let err = engine.transfer("alice", one_ether(CAROL)).await.unwrap_err();
        assert!(matches!(err, CustodyError::ChainUnavailable(_)));
    }

    #[tokio::test]
    async fn sign_transaction_does_not_advance_nonce() {
        let (chain, engine) = setup(5);
        import(&engine, "alice").await;

        let mut request = one_ether(CAROL);
        request.nonce = Some(12);
        request.data = Bytes::from_static(b"\xde\xad");

        let output = engine.sign_transaction("alice", request).await.unwrap();
        assert_eq!(output.payload.nonce, 12);
        assert_eq!(output.payload.gas_limit, chain.estimate);
        assert!(output.signed.v == 45 || output.signed.v == 46);
        assert!(chain.sent().is_empty());
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, None);
    }

    #[tokio::test]
    async fn balance_by_name_or_address() {
        let (chain, engine) = setup(1);
        let account = import(&engine, "alice").await;

        let by_name = engine
            .balance(BalanceTarget::Account("alice".into()))
            .await
            .unwrap();
        assert_eq!(by_name.address, account.address);
        assert_eq!(by_name.wei, chain.balance);

        let by_address = engine.balance(BalanceTarget::Address(CAROL)).await.unwrap();
        assert_eq!(by_address.address, CAROL);

        assert!(matches!(
            engine.balance(BalanceTarget::Account("nobody".into())).await,
            Err(CustodyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn hex_looking_names_are_accounts() {
        let (_, engine) = setup(1);
        let account = import(&engine, "0xfeed").await;

        let balance = engine
            .balance(BalanceTarget::Account("0xfeed".into()))
            .await
            .unwrap();
        assert_eq!(balance.address, account.address);
    }

    #[tokio::test]
    async fn transfer_catches_up_with_chain_nonce() {
        let (chain, engine) = setup(1);
        import(&engine, "alice").await;

        let first = engine.transfer("alice", one_ether(CAROL)).await.unwrap();
        assert_eq!(first.nonce, 0);

        // Signed-only transactions broadcast elsewhere moved the chain on
        chain.pending_nonce.store(5, Ordering::SeqCst);
        let second = engine.transfer("alice", one_ether(CAROL)).await.unwrap();
        assert_eq!(second.nonce, 5);
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, Some(6));
    }

    #[tokio::test]
    async fn sign_transaction_refuses_value_creation_when_whitelisted() {
        let (chain, engine) = setup(1);
        import(&engine, "alice").await;
        engine
            .update_account(
                "alice",
                AccountPatch {
                    allow_list_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let request = TransactionRequest {
            to: None,
            amount: parse_wei("1000000000000000000").unwrap(),
            ..Default::default()
        };
        let err = engine.sign_transaction("alice", request).await.unwrap_err();
        assert_eq!(err.kind(), "access_denied");
        assert_eq!(chain.total_calls(), 0);
    }

    #[tokio::test]
    async fn accepted_broadcast_survives_store_failure() {
        let chain = Arc::new(MockChainClient::new(1));
        let store = Arc::new(ReadOnlySwitchStore::default());
        let engine = CustodyEngine::new(store.clone(), chain.clone());
        import(&engine, "alice").await;

        store.read_only.store(true, Ordering::SeqCst);
        let receipt = engine.transfer("alice", one_ether(CAROL)).await.unwrap();
        assert_eq!(receipt.nonce, 0);
        assert_eq!(chain.sent(), vec![receipt.raw.clone()]);
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, None);

        // Next build picks the chain's count back up
        chain.pending_nonce.store(1, Ordering::SeqCst);
        store.read_only.store(false, Ordering::SeqCst);
        let receipt = engine.transfer("alice", one_ether(CAROL)).await.unwrap();
        assert_eq!(receipt.nonce, 1);
    }

    /// In-memory store whose writes can be switched off.
    #[derive(Default)]
    struct ReadOnlySwitchStore {
        inner: InMemorySecretStore,
        read_only: AtomicBool,
    }

    #[async_trait::async_trait]
    impl SecretStore for ReadOnlySwitchStore {
        async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("read-only")));
            }
            self.inner.put(key, value).await
        }

        async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn deploy_predicts_contract_address() {
        let (chain, engine) = setup(1);
        let account = import(&engine, "alice").await;

        let receipt = engine
            .deploy_contract(
                "alice",
                DeployRequest {
                    abi: EMPTY_ABI.to_string(),
                    bytecode: "0x6080604052".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.to, None);
        assert_eq!(receipt.gas_limit, chain.estimate);
        assert_eq!(receipt.contract_address, Some(account.address.create(0)));
        assert_eq!(engine.read_account("alice").await.unwrap().nonce, Some(1));
    }

    #[tokio::test]
    async fn deploy_rejects_bad_input() {
        let (chain, engine) = setup(1);
        import(&engine, "alice").await;

        let bad_abi = DeployRequest {
            abi: "{not json".to_string(),
            bytecode: "0x60".to_string(),
            ..Default::default()
        };
        let with_args = DeployRequest {
            abi: r#"[{"type":"constructor","inputs":[{"name":"x","type":"uint256"}],"stateMutability":"nonpayable"}]"#.to_string(),
            bytecode: "0x60".to_string(),
            ..Default::default()
        };
        let no_code = DeployRequest {
            abi: EMPTY_ABI.to_string(),
            bytecode: "0x".to_string(),
            ..Default::default()
        };

        for request in [bad_abi, with_args, no_code] {
            let err = engine.deploy_contract("alice", request).await.unwrap_err();
            assert_eq!(err.kind(), "validation_error");
        }
        assert_eq!(chain.total_calls(), 0);
    }

    #[tokio::test]
    async fn deleted_account_cannot_sign() {
        let (_, engine) = setup(1);
        import(&engine, "alice").await;
        engine.delete_account("alice").await.unwrap();

        let err = engine
            .sign_message("alice", "hello", DataEncoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, CustodyError::NotFound(_)));
    }

    #[tokio::test]
    async fn transfer_requires_destination() {
        let (_, engine) = setup(1);
        import(&engine, "alice").await;
        let err = engine
            .transfer("alice", TransactionRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
