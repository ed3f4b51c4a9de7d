//! Bearer token verification.
//!
//! The admission pipeline only talks to the [`TokenVerifier`] trait. Claim
//! extraction and validation are separate operations on purpose: extraction
//! reads the token structure without checking the signature or expiry, and
//! `validate` performs those checks. A token that parses but fails
//! validation is therefore distinguishable from one that does not parse.

use std::fmt;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::models::Claims;

/// Maximum accepted token size in bytes (8KB).
///
/// Larger tokens are rejected before any base64 decoding or HMAC work.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Errors produced while reading a token.
///
/// The pipeline treats every variant as a malformed token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token exceeds {MAX_TOKEN_SIZE_BYTES} bytes")]
    TooLarge,

    #[error("token cannot be parsed")]
    Malformed,

    #[error("token is missing the '{0}' claim")]
    MissingClaim(&'static str),
}

/// Capability to read and validate bearer tokens.
///
/// Implementations must be cheap to share across requests; they hold only
/// read-only key material.
pub trait TokenVerifier: Send + Sync {
    /// Username (`sub`) carried by the token.
    fn extract_username(&self, token: &str) -> Result<String, TokenError>;

    /// Role carried by the token.
    fn extract_role(&self, token: &str) -> Result<String, TokenError>;

    /// Numeric user id carried by the token.
    fn extract_user_id(&self, token: &str) -> Result<i64, TokenError>;

    /// `false` if the signature is invalid or the token has expired.
    fn validate(&self, token: &str) -> bool;

    /// All three claims at once.
    fn extract_claims(&self, token: &str) -> Result<Claims, TokenError> {
        Ok(Claims {
            username: self.extract_username(token)?,
            user_id: self.extract_user_id(token)?,
            role: self.extract_role(token)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "userId")]
    user_id: Option<i64>,
}

/// HMAC-SHA JWT verifier backed by a shared secret.
///
/// Accepts HS256, HS384 and HS512. Key material is not printable via Debug.
#[derive(Clone)]
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    parse_validation: Validation,
}

impl fmt::Debug for JwtTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl JwtTokenVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = algorithms.clone();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        let mut parse_validation = Validation::new(Algorithm::HS256);
        parse_validation.algorithms = algorithms;
        parse_validation.insecure_disable_signature_validation();
        parse_validation.validate_exp = false;
        parse_validation.validate_aud = false;
        parse_validation.required_spec_claims.clear();

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            parse_validation,
        }
    }

    fn check_size(token: &str) -> Result<(), TokenError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "gateway.security.token",
                size = token.len(),
                "token rejected before parsing: too large"
            );
            return Err(TokenError::TooLarge);
        }
        Ok(())
    }

    fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        Self::check_size(token)?;
        decode::<TokenClaims>(token, &self.decoding_key, &self.parse_validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "gateway.security.token", error = %e, "token parse failed");
                TokenError::Malformed
            })
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn extract_username(&self, token: &str) -> Result<String, TokenError> {
        self.parse(token)?
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(TokenError::MissingClaim("sub"))
    }

    fn extract_role(&self, token: &str) -> Result<String, TokenError> {
        self.parse(token)?
            .role
            .ok_or(TokenError::MissingClaim("role"))
    }

    fn extract_user_id(&self, token: &str) -> Result<i64, TokenError> {
        self.parse(token)?
            .user_id
            .ok_or(TokenError::MissingClaim("userId"))
    }

    fn validate(&self, token: &str) -> bool {
        if Self::check_size(token).is_err() {
            return false;
        }
        match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims.sub.is_some_and(|sub| !sub.trim().is_empty()),
            Err(e) => {
                tracing::debug!(target: "gateway.security.token", error = %e, "token validation failed");
                false
            }
        }
    }

    fn extract_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.parse(token)?;
        Ok(Claims {
            username: claims
                .sub
                .filter(|sub| !sub.is_empty())
                .ok_or(TokenError::MissingClaim("sub"))?,
            user_id: claims.user_id.ok_or(TokenError::MissingClaim("userId"))?,
            role: claims.role.ok_or(TokenError::MissingClaim("role"))?,
        })
    }
}
