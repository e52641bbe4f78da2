// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account management API endpoints.
//!
//! These endpoints handle account creation, import, listing, retrieval,
//! policy updates and deletion. Responses never contain key material; a
//! generated recovery phrase is returned once, in the create response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    models::{
        AccountListResponse, CreateAccountRequest, CreateAccountResponse, DeleteAccountResponse,
        UpdateAccountRequest,
    },
    state::AppState,
    storage::AccountView,
};

/// List account names.
#[utoipa::path(
    get,
    path = "/v1/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "Account names in lexicographic order", body = AccountListResponse),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let accounts = state.engine.list_accounts().await?;
    Ok(Json(AccountListResponse { accounts }))
}

/// Create an account.
///
/// Without a `mnemonic` a fresh phrase is generated and returned in this
/// response only. It cannot be retrieved afterwards.
#[utoipa::path(
    post,
    path = "/v1/accounts/{name}",
    tag = "Accounts",
    params(("name" = String, Path, description = "Account name")),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = CreateAccountResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Account already exists"),
        (status = 422, description = "Invalid mnemonic")
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), ApiError> {
    let created = state
        .engine
        .create_account(&name, request.into_params()?)
        .await?;

    let response = CreateAccountResponse {
        account: AccountView::from(created.account),
        mnemonic: created.mnemonic,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Import an account from an existing recovery phrase.
#[utoipa::path(
    post,
    path = "/v1/accounts/import/{name}",
    tag = "Accounts",
    params(("name" = String, Path, description = "Account name")),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account imported", body = AccountView),
        (status = 400, description = "Invalid request or missing mnemonic"),
        (status = 409, description = "Account already exists"),
        (status = 422, description = "Invalid mnemonic")
    )
)]
pub async fn import_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountView>), ApiError> {
    let account = state
        .engine
        .import_account(&name, request.into_params()?)
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Read an account.
#[utoipa::path(
    get,
    path = "/v1/accounts/{name}",
    tag = "Accounts",
    params(("name" = String, Path, description = "Account name")),
    responses(
        (status = 200, description = "Account details", body = AccountView),
        (status = 404, description = "Account not found")
    )
)]
pub async fn read_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AccountView>, ApiError> {
    let account = state.engine.read_account(&name).await?;
    Ok(Json(account.into()))
}

/// Update an account's whitelist, blacklist or whitelist enforcement.
#[utoipa::path(
    put,
    path = "/v1/accounts/{name}",
    tag = "Accounts",
    params(("name" = String, Path, description = "Account name")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<AccountView>, ApiError> {
    let account = state
        .engine
        .update_account(&name, request.into_patch()?)
        .await?;
    Ok(Json(account.into()))
}

/// Delete an account and its key material.
///
/// **Warning**: the private key is destroyed. Only the recovery phrase can
/// restore the account.
#[utoipa::path(
    delete,
    path = "/v1/accounts/{name}",
    tag = "Accounts",
    params(("name" = String, Path, description = "Account name")),
    responses(
        (status = 200, description = "Account deleted", body = DeleteAccountResponse),
        (status = 404, description = "Account not found")
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    state.engine.delete_account(&name).await?;
    Ok(Json(DeleteAccountResponse {
        message: format!("Account {name} deleted"),
        name,
    }))
}
