//! Role check middleware.
//!
//! Last stage of the admission pipeline. Enforces the [`Requirement`] the
//! authentication stage stored, using the identity it attached.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::errors::AppError;
use crate::models::{Identity, IdentityExt, Requirement};
use crate::security::DEFAULT_REQUIREMENT;

/// Decides whether `identity` satisfies `requirement`.
///
/// # Errors
/// - `AppError::MissingCredential` if a requirement needs an identity and none is attached
/// - `AppError::Forbidden` if `AdminOnly` and the role is not `ADMIN`
pub fn authorize(requirement: Requirement, identity: Option<&Identity>) -> Result<(), AppError> {
    match (requirement, identity) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(AppError::MissingCredential),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::AdminOnly, Some(identity)) if identity.is_admin() => Ok(()),
        (Requirement::AdminOnly, Some(identity)) => {
            tracing::warn!(
                target: "gateway.middleware.authorization",
                user_id = identity.user_id,
                role = %identity.role,
                "admin-only route denied"
            );
            Err(AppError::Forbidden)
        }
    }
}

/// Authorization middleware handler.
///
/// A request that never went through authentication carries no requirement
/// and is held to the default one.
pub async fn authorization_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    let requirement = req
        .extensions()
        .get::<Requirement>()
        .copied()
        .unwrap_or(DEFAULT_REQUIREMENT);

    authorize(requirement, req.identity())?;
    Ok(next.run(req).await)
}
