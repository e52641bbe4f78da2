// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer, signing, deployment and balance endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    blockchain::{parse_address, DataEncoding},
    engine::BalanceTarget,
    error::ApiError,
    models::{
        BalanceQuery, BalanceResponse, DeployContractRequest, SignMessageRequest,
        SignMessageResponse, SignTransactionRequest, SignTransactionResponse, TransactionResponse,
        TransferRequest,
    },
    state::AppState,
};

/// Send native value and broadcast the transaction.
///
/// The destination is checked against the account's blacklist and
/// whitelist before any chain call. The account nonce advances only once
/// the node accepted the transaction.
#[utoipa::path(
    post,
    path = "/v1/accounts/{name}/transfer",
    tag = "Transactions",
    params(("name" = String, Path, description = "Account name")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transaction broadcast", body = TransactionResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Destination refused by policy"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let receipt = state
        .engine
        .transfer(&name, request.into_request()?)
        .await?;
    Ok(Json(receipt.into()))
}

/// Native balance of the account, or of `address` when given.
#[utoipa::path(
    get,
    path = "/v1/accounts/{name}/balance",
    tag = "Transactions",
    params(
        ("name" = String, Path, description = "Account name"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Balance in wei", body = BalanceResponse),
        (status = 400, description = "Invalid address"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn balance(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let target = match query.address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() => BalanceTarget::Address(parse_address(address)?),
        _ => BalanceTarget::Account(name),
    };
    let balance = state.engine.balance(target).await?;
    Ok(Json(balance.into()))
}

/// Sign a transaction without broadcasting it.
#[utoipa::path(
    post,
    path = "/v1/accounts/{name}/sign-tx",
    tag = "Transactions",
    params(("name" = String, Path, description = "Account name")),
    request_body = SignTransactionRequest,
    responses(
        (status = 200, description = "Signed transaction", body = SignTransactionResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Destination refused by policy"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn sign_transaction(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SignTransactionRequest>,
) -> Result<Json<SignTransactionResponse>, ApiError> {
    let output = state
        .engine
        .sign_transaction(&name, request.into_request()?)
        .await?;
    Ok(Json(output.into()))
}

/// Sign a personal message (EIP-191).
#[utoipa::path(
    post,
    path = "/v1/accounts/{name}/sign",
    tag = "Transactions",
    params(("name" = String, Path, description = "Account name")),
    request_body = SignMessageRequest,
    responses(
        (status = 200, description = "Message signature", body = SignMessageResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn sign_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SignMessageRequest>,
) -> Result<Json<SignMessageResponse>, ApiError> {
    let encoding: DataEncoding = request.encoding.as_deref().unwrap_or_default().parse()?;
    let signed = state
        .engine
        .sign_message(&name, &request.message, encoding)
        .await?;
    Ok(Json(signed.into()))
}

/// Deploy compiled contract code.
#[utoipa::path(
    post,
    path = "/v1/accounts/{name}/deploy",
    tag = "Transactions",
    params(("name" = String, Path, description = "Account name")),
    request_body = DeployContractRequest,
    responses(
        (status = 200, description = "Deployment broadcast", body = TransactionResponse),
        (status = 400, description = "Invalid ABI or bytecode"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn deploy_contract(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<DeployContractRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let receipt = state
        .engine
        .deploy_contract(&name, request.into_request()?)
        .await?;
    Ok(Json(receipt.into()))
}
