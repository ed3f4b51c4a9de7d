//! Error types for the gateway.
//!
//! Authentication failures render as the bare `{"error": "<message>"}` body
//! that clients of the gateway already parse. Every other error uses the
//! shared [`ApiResponse`] envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the gateway.
pub type AppResult<T> = Result<T, AppError>;

/// Gateway error taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential header, or the header does not carry the configured scheme.
    #[error("Missing or invalid Authorization header")]
    MissingCredential,

    /// A token is present but cannot be parsed.
    #[error("Invalid JWT token")]
    MalformedToken,

    /// The token parsed but its signature or expiry check failed.
    #[error("JWT token is expired or invalid")]
    InvalidOrExpiredToken,

    /// The caller is authenticated but lacks the required role.
    #[error("Access denied")]
    Forbidden,

    /// The request could not be read.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body is larger than the gateway forwards.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// No backend owns the requested path.
    #[error("no route for path: {0}")]
    RouteNotFound(String),

    /// A backend service could not be reached or answered unusably.
    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Body of an authentication/authorization rejection.
#[derive(Debug, Serialize)]
pub struct AuthErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredential
            | AppError::MalformedToken
            | AppError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code used in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredential => "MISSING_CREDENTIAL",
            AppError::MalformedToken => "MALFORMED_TOKEN",
            AppError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            AppError::Forbidden => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is rendered with the bare `{"error": ...}` body.
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            AppError::MissingCredential
                | AppError::MalformedToken
                | AppError::InvalidOrExpiredToken
                | AppError::Forbidden
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_access_denial() {
            let body = AuthErrorBody {
                error: self.to_string(),
            };
            return (status, Json(body)).into_response();
        }

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }

        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_auth_errors_use_bare_error_body() {
        let (status, body) = body_json(AppError::MissingCredential).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            serde_json::json!({"error": "Missing or invalid Authorization header"})
        );

        let (_, body) = body_json(AppError::MalformedToken).await;
        assert_eq!(body, serde_json::json!({"error": "Invalid JWT token"}));

        let (_, body) = body_json(AppError::InvalidOrExpiredToken).await;
        assert_eq!(
            body,
            serde_json::json!({"error": "JWT token is expired or invalid"})
        );
    }

    #[tokio::test]
    async fn test_forbidden_is_403() {
        let (status, body) = body_json(AppError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, serde_json::json!({"error": "Access denied"}));
    }

    #[tokio::test]
    async fn test_route_not_found_uses_envelope() {
        let (status, body) = body_json(AppError::RouteNotFound("/nope".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "ROUTE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_payload_too_large_is_413() {
        let (status, body) = body_json(AppError::PayloadTooLarge(1024)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[test]
    fn test_upstream_maps_to_bad_gateway() {
        assert_eq!(
            AppError::Upstream("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
