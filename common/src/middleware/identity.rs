//! Identity propagation middleware.
//!
//! Runs after authentication. Re-reads the raw bearer token on its own and
//! stamps four `X-User-*` headers on both the forwarded request and the
//! response. Never rejects: anything it cannot read becomes the anonymous
//! identity. Downstream services trust these headers, so they must only be
//! reachable through the gateway.

use axum::{
    extract::{Request, State},
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::middleware::auth::SecurityState;
use crate::models::{Identity, IdentityExt};

pub static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub static X_USERNAME: HeaderName = HeaderName::from_static("x-username");
pub static X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");
pub static X_USER_INFO: HeaderName = HeaderName::from_static("x-user-info");

/// Encoded values of the four propagation headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    user_id: HeaderValue,
    username: HeaderValue,
    role: HeaderValue,
    info: HeaderValue,
}

impl IdentityHeaders {
    /// Headers for `identity`, or the anonymous headers if any value cannot
    /// be carried in an HTTP header.
    pub fn for_identity(identity: &Identity) -> Self {
        Self::encode(identity).unwrap_or_else(|| {
            tracing::debug!(
                target: "gateway.middleware.identity",
                "identity not representable as headers, using anonymous"
            );
            Self::anonymous()
        })
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: HeaderValue::from_static("0"),
            username: HeaderValue::from_static("anonymous"),
            role: HeaderValue::from_static("USER"),
            info: HeaderValue::from_static("userId=0;username=anonymous;role=USER"),
        }
    }

    fn encode(identity: &Identity) -> Option<Self> {
        Some(Self {
            user_id: HeaderValue::from(identity.user_id),
            username: HeaderValue::from_str(&identity.username).ok()?,
            role: HeaderValue::from_str(&identity.role).ok()?,
            info: HeaderValue::from_str(&identity.info()).ok()?,
        })
    }

    /// Writes the headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_USER_ID.clone(), self.user_id.clone());
        headers.insert(X_USERNAME.clone(), self.username.clone());
        headers.insert(X_USER_ROLE.clone(), self.role.clone());
        headers.insert(X_USER_INFO.clone(), self.info.clone());
    }
}

/// Identity derived from the raw token, independent of the authentication
/// stage's result. Falls back to anonymous on any failure.
pub fn resolve_identity(security: &SecurityState, req: &Request) -> Identity {
    let Some(token) = security.bearer_token(req.headers()) else {
        return Identity::anonymous();
    };

    match security.verifier.extract_claims(token) {
        Ok(claims) => Identity {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
            verified: req.identity().is_some(),
        },
        Err(e) => {
            tracing::debug!(
                target: "gateway.middleware.identity",
                error = %e,
                "token unreadable, propagating anonymous identity"
            );
            Identity::anonymous()
        }
    }
}

/// Identity propagation middleware handler.
pub async fn identity_middleware(
    State(security): State<SecurityState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(&security, &req);
    let headers = IdentityHeaders::for_identity(&identity);

    headers.apply(req.headers_mut());
    let mut response = next.run(req).await;
    headers.apply(response.headers_mut());

    response
}
