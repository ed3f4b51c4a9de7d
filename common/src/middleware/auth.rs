//! Authentication middleware.
//!
//! First stage of the admission pipeline. Classifies the request with the
//! [`PolicyMatcher`], and for non-public requests verifies the bearer token
//! and attaches a verified [`Identity`] to the request extensions. Any
//! failure ends the request with 401.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::HeaderName, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::instrument;

use crate::config::{ConfigError, SecurityConfig};
use crate::errors::AppError;
use crate::models::{Claims, Identity, Requirement};
use crate::security::{check_path, JwtTokenVerifier, PolicyMatcher, TokenVerifier};

/// Read-only state shared by every stage of the admission pipeline.
#[derive(Clone)]
pub struct SecurityState {
    pub policy: Arc<PolicyMatcher>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub token_header: HeaderName,
    pub token_prefix: Arc<str>,
}

impl SecurityState {
    pub fn new(
        policy: Arc<PolicyMatcher>,
        verifier: Arc<dyn TokenVerifier>,
        token_header: HeaderName,
        token_prefix: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            policy,
            verifier,
            token_header,
            token_prefix: token_prefix.into(),
        }
    }

    /// Builds the state from configuration: loads the rule table (built-in
    /// unless a rules file is configured) and the JWT verifier.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, ConfigError> {
        let policy = match &config.access_rules_file {
            Some(path) => PolicyMatcher::from_json_file(path)?,
            None => PolicyMatcher::default(),
        };

        let token_header = HeaderName::from_bytes(config.token_header.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                key: "JWT_HEADER",
                reason: e.to_string(),
            }
        })?;

        tracing::info!(
            rules = policy.rules().len(),
            header = %token_header,
            "admission policy loaded"
        );

        Ok(Self::new(
            Arc::new(policy),
            Arc::new(JwtTokenVerifier::new(config.jwt_secret.as_bytes())),
            token_header,
            config.token_prefix.as_str(),
        ))
    }

    /// Token from the configured header, with the scheme prefix stripped.
    ///
    /// `None` if the header is absent, not visible ASCII, or lacks the prefix.
    pub fn bearer_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(&self.token_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(&*self.token_prefix))
    }
}

/// Authentication middleware handler.
///
/// Stores the computed [`Requirement`] in the request extensions for the
/// authorization stage, then admits or rejects the request.
#[instrument(skip_all, name = "gateway.middleware.auth", fields(method = %req.method(), path = %req.uri().path()))]
pub async fn auth_middleware(
    State(security): State<SecurityState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&security, &mut req)?;
    Ok(next.run(req).await)
}

/// Runs the authentication state machine against `req`.
///
/// Paths a backend could resolve differently from the policy are refused
/// with 400 before classification.
pub fn authenticate(security: &SecurityState, req: &mut Request) -> Result<(), AppError> {
    check_path(req.uri().path()).map_err(|e| {
        tracing::warn!(target: "gateway.middleware.auth", path = %req.uri().path(), error = %e, "ambiguous request path refused");
        AppError::BadRequest(e.to_string())
    })?;

    let requirement = security.policy.classify(req.method(), req.uri().path());
    req.extensions_mut().insert(requirement);

    if requirement == Requirement::Public {
        tracing::trace!(target: "gateway.middleware.auth", "public route, token not inspected");
        return Ok(());
    }

    let token = security
        .bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(|| {
            tracing::warn!(
                target: "gateway.middleware.auth",
                header = %security.token_header,
                "token header missing or does not begin with the configured prefix"
            );
            AppError::MissingCredential
        })?;

    let username = security.verifier.extract_username(&token).map_err(|e| {
        tracing::error!(target: "gateway.middleware.auth", error = %e, "cannot get the username from token");
        AppError::MalformedToken
    })?;

    if req.extensions().get::<Identity>().is_some() {
        tracing::debug!(target: "gateway.middleware.auth", "identity already attached, skipping validation");
        return Ok(());
    }

    if !security.verifier.validate(&token) {
        tracing::error!(target: "gateway.middleware.auth", "token is expired or invalid");
        return Err(AppError::InvalidOrExpiredToken);
    }

    let (role, user_id) = security
        .verifier
        .extract_role(&token)
        .and_then(|role| Ok((role, security.verifier.extract_user_id(&token)?)))
        .map_err(|e| {
            tracing::error!(target: "gateway.middleware.auth", error = %e, "validated token lacks identity claims");
            AppError::MalformedToken
        })?;

    tracing::debug!(
        target: "gateway.middleware.auth",
        user_id,
        role = %role,
        %requirement,
        "request authenticated"
    );

    req.extensions_mut().insert(Identity::verified(Claims {
        username,
        user_id,
        role,
    }));

    Ok(())
}
