//! Environment-driven configuration.
//!
//! Values are read once at startup. Everything here is shared read-only
//! across requests afterwards.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_HEADER: &str = "Authorization";
const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot load access rules from {path}: {reason}")]
    RulesFile { path: String, reason: String },
}

/// Source of raw configuration values.
///
/// Production reads the process environment; tests pass a closure.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from `std::env`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub security: SecurityConfig,
    pub services: ServiceUrls,
    pub upstream_timeout_secs: u64,
}

/// Token header settings and signing material.
#[derive(Clone)]
pub struct SecurityConfig {
    /// Header carrying the token, e.g. `Authorization`.
    pub token_header: String,
    /// Scheme prefix stripped from the header value, e.g. `Bearer `.
    pub token_prefix: String,
    /// HMAC secret used to validate tokens.
    pub jwt_secret: String,
    /// Optional JSON file replacing the built-in access rule table.
    pub access_rules_file: Option<PathBuf>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_header", &self.token_header)
            .field("token_prefix", &self.token_prefix)
            .field("jwt_secret", &"[REDACTED]")
            .field("access_rules_file", &self.access_rules_file)
            .finish()
    }
}

/// Base URLs of the backend services.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub user_service: String,
    pub workout_service: String,
    pub gamification_service: String,
}

impl AppConfig {
    /// Loads configuration for `service_name` from the process environment.
    pub fn load_with_service(service_name: &str) -> Result<Self, ConfigError> {
        Self::from_source(service_name, &EnvSource)
    }

    /// Loads configuration from an arbitrary source.
    pub fn from_source(service_name: &str, source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let host = source
            .get("SERVER_HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match source.get("SERVER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "SERVER_PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let upstream_timeout_secs = match source.get("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            service_name: service_name.to_string(),
            host,
            port,
            security: SecurityConfig::from_source(source)?,
            services: ServiceUrls::from_source(source),
            upstream_timeout_secs,
        })
    }
}

impl SecurityConfig {
    fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let token_header = source
            .get("JWT_HEADER")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_HEADER.to_string());

        axum::http::HeaderName::from_bytes(token_header.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                key: "JWT_HEADER",
                reason: e.to_string(),
            }
        })?;

        // The prefix keeps its trailing space; it is compared literally.
        let token_prefix = source
            .get("JWT_PREFIX")
            .unwrap_or_else(|| DEFAULT_TOKEN_PREFIX.to_string());
        if token_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                key: "JWT_PREFIX",
                reason: "must not be empty".to_string(),
            });
        }

        let jwt_secret = source
            .get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let access_rules_file = source
            .get("ACCESS_RULES_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            token_header,
            token_prefix,
            jwt_secret,
            access_rules_file,
        })
    }
}

impl ServiceUrls {
    fn from_source(source: &dyn ConfigSource) -> Self {
        let url = |key: &str, default: &str| {
            source
                .get(key)
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            user_service: url("USER_SERVICE_URL", "http://localhost:8081"),
            workout_service: url("WORKOUT_SERVICE_URL", "http://localhost:8082"),
            gamification_service: url("GAMIFICATION_SERVICE_URL", "http://localhost:8083"),
        }
    }
}
