// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;

/// Errors produced by the custody core.
///
/// Every variant maps onto one stable error kind (see [`CustodyError::kind`])
/// so callers can branch on the kind without parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account already exists: {0}")]
    Conflict(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Unsupported derivation index: {0}")]
    UnsupportedDerivationIndex(i64),

    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CustodyError {
    /// Stable, machine readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CustodyError::Validation(_) | CustodyError::UnsupportedDerivationIndex(_) => {
                "validation_error"
            }
            CustodyError::NotFound(_) => "not_found",
            CustodyError::Conflict(_) => "conflict",
            CustodyError::AccessDenied(_) => "access_denied",
            CustodyError::Crypto(_) | CustodyError::InvalidMnemonic(_) => "crypto_error",
            CustodyError::ChainUnavailable(_) => "chain_unavailable",
            CustodyError::Storage(_) => "storage_error",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    pub fn chain(message: impl Into<String>) -> Self {
        Self::ChainUnavailable(message.into())
    }
}

/// Result alias for custody operations.
pub type CustodyResult<T> = Result<T, CustodyError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }
}

impl From<CustodyError> for ApiError {
    fn from(err: CustodyError) -> Self {
        let status = match &err {
            CustodyError::Validation(_) | CustodyError::UnsupportedDerivationIndex(_) => {
                StatusCode::BAD_REQUEST
            }
            CustodyError::NotFound(_) => StatusCode::NOT_FOUND,
            CustodyError::Conflict(_) => StatusCode::CONFLICT,
            CustodyError::AccessDenied(_) => StatusCode::FORBIDDEN,
            CustodyError::Crypto(_) | CustodyError::InvalidMnemonic(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CustodyError::ChainUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CustodyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(CustodyError::validation("x").kind(), "validation_error");
        assert_eq!(CustodyError::UnsupportedDerivationIndex(-1).kind(), "validation_error");
        assert_eq!(CustodyError::InvalidMnemonic("x".into()).kind(), "crypto_error");
        assert_eq!(CustodyError::chain("down").kind(), "chain_unavailable");
    }

    #[test]
    fn custody_errors_map_to_status() {
        let nf: ApiError = CustodyError::NotFound("alice".into()).into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.kind, "not_found");

        let conflict: ApiError = CustodyError::Conflict("alice".into()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let denied: ApiError = CustodyError::AccessDenied("0xabc".into()).into();
        assert_eq!(denied.status, StatusCode::FORBIDDEN);

        let chain: ApiError = CustodyError::chain("timeout").into();
        assert_eq!(chain.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","kind":"validation_error"}"#);
    }
}
