// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational ETH Custody - Key Custody & Transaction Authorization Service
//!
//! Derives EVM signing keys from BIP-39 recovery phrases, enforces a
//! per-account destination policy and produces signed transactions and
//! personal-message signatures.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - key derivation, transaction assembly, signing, chain client
//! - `engine` - request pipeline with per-account serialization
//! - `policy` - whitelist / blacklist evaluation
//! - `registry` - account lifecycle
//! - `storage` - secret store backends and the account repository

pub mod api;
pub mod blockchain;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod policy;
pub mod registry;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
