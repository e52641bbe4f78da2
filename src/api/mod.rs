// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AccountListResponse, CreateAccountRequest, CreateAccountResponse, DeleteAccountResponse,
        DeployContractRequest, SignMessageRequest, SignMessageResponse, SignTransactionRequest,
        SignTransactionResponse, TransactionResponse, TransferRequest, UpdateAccountRequest,
    },
    state::AppState,
    storage::AccountView,
};

pub mod accounts;
pub mod health;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts/import/{name}", post(accounts::import_account))
        .route(
            "/accounts/{name}",
            get(accounts::read_account)
                .post(accounts::create_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/{name}/transfer", post(transactions::transfer))
        .route("/accounts/{name}/balance", get(transactions::balance))
        .route("/accounts/{name}/sign-tx", post(transactions::sign_transaction))
        .route("/accounts/{name}/sign", post(transactions::sign_message))
        .route("/accounts/{name}/deploy", post(transactions::deploy_contract));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::list_accounts,
        accounts::create_account,
        accounts::import_account,
        accounts::read_account,
        accounts::update_account,
        accounts::delete_account,
        transactions::transfer,
        transactions::balance,
        transactions::sign_transaction,
        transactions::sign_message,
        transactions::deploy_contract,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AccountView,
            AccountListResponse,
            CreateAccountRequest,
            CreateAccountResponse,
            UpdateAccountRequest,
            DeleteAccountResponse,
            TransferRequest,
            TransactionResponse,
            SignTransactionRequest,
            SignTransactionResponse,
            SignMessageRequest,
            SignMessageResponse,
            DeployContractRequest,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Accounts", description = "Account lifecycle and destination policy"),
        (name = "Transactions", description = "Transfers, signing and deployment"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
