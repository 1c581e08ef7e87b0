//! Caller identity.
//!
//! Sessions are terminated by the upstream auth gateway, which forwards the
//! authenticated account id in `X-Account-Id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::response::ApiError;

pub const X_ACCOUNT_ID: &str = "x-account-id";

/// The account making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount(pub u64);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(X_ACCOUNT_ID)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Account-Id header".to_string()))?;

        raw.trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(AuthenticatedAccount)
            .ok_or_else(|| ApiError::Unauthorized("Invalid X-Account-Id header".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<AuthenticatedAccount, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(X_ACCOUNT_ID, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthenticatedAccount::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_account_header() {
        assert_eq!(extract(Some("42")).await.unwrap(), AuthenticatedAccount(42));
        assert!(matches!(extract(None).await, Err(ApiError::Unauthorized(_))));
        assert!(matches!(extract(Some("abc")).await, Err(ApiError::Unauthorized(_))));
        assert!(matches!(extract(Some("0")).await, Err(ApiError::Unauthorized(_))));
    }
}
