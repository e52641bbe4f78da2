// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction and message signing.
//!
//! Private keys are stored as PKCS#8 PEM. This module converts between PEM
//! and alloy signers and produces:
//! - legacy transactions bound to a chain id (EIP-155)
//! - personal-message signatures (EIP-191)
//!
//! Nothing here touches storage or the network.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope},
    eips::eip2718::Encodable2718,
    primitives::{eip191_hash_message, Address, Bytes, Signature, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use k256::{
    ecdsa::SigningKey,
    pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding},
    SecretKey,
};

use super::transactions::SignablePayload;
use crate::error::{CustodyError, CustodyResult};

/// A signed, broadcast-ready transaction.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// EIP-2718 encoded transaction (RLP for legacy)
    pub raw: Bytes,
    /// Transaction hash
    pub hash: B256,
    pub r: U256,
    pub s: U256,
    /// EIP-155 `v` (`chain_id * 2 + 35 + parity`)
    pub v: u64,
}

/// A personal-message signature.
#[derive(Debug, Clone)]
pub struct MessageSignature {
    /// 65-byte `r || s || v` signature with `v` in {27, 28}
    pub signature: Bytes,
    /// EIP-191 digest that was signed
    pub hash: B256,
    pub r: U256,
    pub s: U256,
    pub v: u8,
}

/// Encode a signer's private key as PKCS#8 PEM.
pub fn signer_to_pem(signer: &PrivateKeySigner) -> CustodyResult<String> {
    let secret = SecretKey::from_slice(signer.to_bytes().as_slice())
        .map_err(|e| CustodyError::crypto(format!("Invalid key material: {e}")))?;
    let pem = secret
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CustodyError::crypto(format!("PEM encoding failed: {e}")))?;
    Ok(pem.as_str().to_string())
}

/// Create a signer from PEM-encoded private key.
///
/// Accepts PKCS#8 and SEC1 DER inside the PEM envelope.
pub fn signer_from_pem(pem_bytes: &[u8]) -> CustodyResult<PrivateKeySigner> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| CustodyError::crypto(format!("Invalid UTF-8 in key material: {e}")))?;

    let pem = pem::parse(pem_str).map_err(|e| CustodyError::crypto(format!("Invalid PEM: {e}")))?;

    let secret = SecretKey::from_pkcs8_der(pem.contents())
        .or_else(|_| SecretKey::from_sec1_der(pem.contents()))
        .map_err(|e| CustodyError::crypto(format!("Invalid key format: {e}")))?;

    Ok(PrivateKeySigner::from_signing_key(SigningKey::from(secret)))
}

/// Sign a resolved transaction with EIP-155 replay protection.
pub fn sign_transaction(
    signer: &PrivateKeySigner,
    payload: &SignablePayload,
) -> CustodyResult<SignedTransaction> {
    if signer.address() != payload.from {
        return Err(CustodyError::crypto(format!(
            "Key material does not match sender {}",
            payload.from
        )));
    }

    // Reject chain ids whose EIP-155 `v` does not fit before signing
    eip155_v(true, payload.chain_id)?;

    let tx = payload.to_legacy();
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| CustodyError::crypto(format!("Transaction signing failed: {e}")))?;

    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let raw = TxEnvelope::from(signed).encoded_2718();

    Ok(SignedTransaction {
        raw: raw.into(),
        hash,
        r: signature.r(),
        s: signature.s(),
        v: eip155_v(signature.v(), payload.chain_id)?,
    })
}

/// Sign `message` as an EIP-191 personal message.
pub fn sign_message(signer: &PrivateKeySigner, message: &[u8]) -> CustodyResult<MessageSignature> {
    let signature = signer
        .sign_message_sync(message)
        .map_err(|e| CustodyError::crypto(format!("Message signing failed: {e}")))?;

    let bytes = signature.as_bytes();
    Ok(MessageSignature {
        signature: Bytes::copy_from_slice(&bytes),
        hash: eip191_hash_message(message),
        r: signature.r(),
        s: signature.s(),
        v: bytes[64],
    })
}

/// Recover the signer of an EIP-191 personal message.
pub fn recover_message_signer(message: &[u8], signature: &[u8]) -> CustodyResult<Address> {
    let signature = Signature::try_from(signature)
        .map_err(|e| CustodyError::validation(format!("Invalid signature: {e}")))?;
    signature
        .recover_address_from_msg(message)
        .map_err(|e| CustodyError::crypto(format!("Signature recovery failed: {e}")))
}

fn eip155_v(parity: bool, chain_id: u64) -> CustodyResult<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35 + u64::from(parity)))
        .ok_or_else(|| CustodyError::crypto(format!("Chain id {chain_id} too large for EIP-155")))
}
