//! Identity models.
//!
//! [`Claims`] are what a verified token says about its bearer; [`Identity`]
//! is what the gateway attaches to a request and forwards downstream.

use std::fmt;

/// Username used when no verified identity is available.
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// Role used when no verified identity is available.
pub const DEFAULT_ROLE: &str = "USER";

/// Role required by admin-only routes.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Claims extracted from a bearer token.
///
/// Only produced by a [`TokenVerifier`](crate::security::TokenVerifier).
#[derive(Clone, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    pub user_id: i64,
    pub role: String,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("username", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

/// Request-scoped identity.
///
/// Verified identities are stored in the request extensions by the
/// authentication stage. Anonymous identities only ever appear in propagation
/// headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub verified: bool,
}

impl Identity {
    /// The canonical anonymous identity.
    pub fn anonymous() -> Self {
        Self {
            user_id: 0,
            username: ANONYMOUS_USERNAME.to_string(),
            role: DEFAULT_ROLE.to_string(),
            verified: false,
        }
    }

    /// Builds a verified identity from token claims.
    pub fn verified(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
            verified: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Composite value of the `X-User-Info` header.
    pub fn info(&self) -> String {
        format!(
            "userId={};username={};role={}",
            self.user_id, self.username, self.role
        )
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self::verified(claims)
    }
}

/// Access to the verified identity stored in request extensions.
pub trait IdentityExt {
    /// Returns `None` unless the authentication stage verified a token for
    /// this request.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}
