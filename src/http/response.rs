//! Error responses.
//!
//! Every failure leaves the API as `{"error": <code>, "message": <text>}`
//! with a status derived from the error's layer:
//!
//! | Source                      | Status |
//! |-----------------------------|--------|
//! | missing/invalid identity    | 401    |
//! | account not found           | 404    |
//! | already claimed / duplicate | 409    |
//! | other domain errors         | 400    |
//! | known contract revert       | 422    |
//! | other chain failures        | 502    |
//! | store failures              | 500    |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::chain::ChainError;
use crate::relay::RelayError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Relay(e) => match e {
                RelayError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                RelayError::AlreadyClaimed(_)
                | RelayError::DuplicateTransaction(_)
                | RelayError::TransferPending(_) => StatusCode::CONFLICT,
                RelayError::Chain(ChainError::Rejected { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
                RelayError::Chain(_) => StatusCode::BAD_GATEWAY,
                RelayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
            ApiError::Relay(RelayError::Chain(ChainError::Rejected { kind, .. })) => kind.code(),
            ApiError::Relay(e) => e.label(),
        }
    }

    /// Client-facing text. Store internals are not exposed.
    fn message(&self) -> String {
        match self {
            ApiError::Relay(RelayError::Store(_)) | ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::Relay(RelayError::Chain(ChainError::Rejected { kind, .. })) => kind.message().to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::RevertKind;
    use crate::ledger::StoreError;
    use alloy::primitives::{TxHash, U256};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (RelayError::AccountNotFound(1).into(), StatusCode::NOT_FOUND),
            (RelayError::AlreadyClaimed(1).into(), StatusCode::CONFLICT),
            (RelayError::DuplicateTransaction(TxHash::ZERO).into(), StatusCode::CONFLICT),
            (RelayError::TransferPending(None).into(), StatusCode::CONFLICT),
            (
                RelayError::InsufficientLiquidity {
                    required: U256::from(2),
                    available: U256::from(1),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                RelayError::Chain(ChainError::Rejected {
                    kind: RevertKind::AlreadyAccepted,
                    tx_hash: None,
                })
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                RelayError::Chain(ChainError::Rpc("down".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Store(StoreError::Io("disk".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{}", err);
        }
    }

    #[test]
    fn test_store_details_hidden() {
        let err = ApiError::from(RelayError::Store(StoreError::Io("/var/secret".into())));
        assert!(!err.message().contains("secret"));
        assert_eq!(err.code(), "store_error");
    }
}
