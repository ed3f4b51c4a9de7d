//! API response wrapper types.
//!
//! Gateway-owned failures (no route, upstream errors, bad requests) share
//! this envelope. Authentication rejections do not; see
//! [`crate::errors::AppError`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse {
    /// Always `false` for this envelope.
    pub success: bool,

    /// Error details.
    pub error: ApiError,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// API error details.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g., "ROUTE_NOT_FOUND").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta {
                timestamp: Utc::now(),
            },
        }
    }
}
