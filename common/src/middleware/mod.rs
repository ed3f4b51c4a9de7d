//! Middleware components for the gateway.
//!
//! The admission pipeline runs three stages in a fixed order:
//!
//! 1. [`auth::auth_middleware`]: may reject with 401
//! 2. [`identity::identity_middleware`]: never rejects
//! 3. [`authorization::authorization_middleware`]: may reject with 403
//!
//! [`admission_pipeline`] is the only supported way to install them.

pub mod auth;
pub mod authorization;
pub mod identity;
pub mod request_id;

use axum::{middleware, Router};

// Re-export commonly used types
pub use auth::{auth_middleware, SecurityState};
pub use authorization::authorization_middleware;
pub use identity::{identity_middleware, IdentityHeaders};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};

/// Wraps every route and the fallback of `router` in the admission pipeline.
///
/// Layers run outermost-first, so they are added in reverse stage order.
pub fn admission_pipeline<S>(router: Router<S>, security: SecurityState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn(authorization_middleware))
        .layer(middleware::from_fn_with_state(
            security.clone(),
            identity_middleware,
        ))
        .layer(middleware::from_fn_with_state(security, auth_middleware))
}
