//! Access-rule models.

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Deserializer};

/// Access level a request must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Admitted without looking at credentials.
    Public,
    /// Requires a verified identity with the `ADMIN` role.
    AdminOnly,
    /// Requires any verified identity.
    Authenticated,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => write!(f, "public"),
            Requirement::AdminOnly => write!(f, "admin_only"),
            Requirement::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Which methods a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    Any,
    Exact(Method),
}

impl MethodPattern {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Exact(m) => m == method,
        }
    }
}

impl<'de> Deserialize<'de> for MethodPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("any") || raw == "*" {
            return Ok(MethodPattern::Any);
        }
        Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map(MethodPattern::Exact)
            .map_err(|_| serde::de::Error::custom(format!("invalid HTTP method: {raw}")))
    }
}

/// One row of the access-rule table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRule {
    #[serde(default = "any_method")]
    pub method: MethodPattern,
    pub path_prefix: String,
    pub requirement: Requirement,
}

fn any_method() -> MethodPattern {
    MethodPattern::Any
}

impl AccessRule {
    /// Rule that applies to every method.
    pub fn any(path_prefix: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            method: MethodPattern::Any,
            path_prefix: path_prefix.into(),
            requirement,
        }
    }

    /// Rule that applies to a single method.
    pub fn method(method: Method, path_prefix: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            method: MethodPattern::Exact(method),
            path_prefix: path_prefix.into(),
            requirement,
        }
    }

    /// Literal prefix containment plus method match.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && path.starts_with(&self.path_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_matches_prefix_and_method() {
        let rule = AccessRule::method(Method::GET, "/api/v1/exercises", Requirement::Public);
        assert!(rule.matches(&Method::GET, "/api/v1/exercises/123"));
        assert!(!rule.matches(&Method::POST, "/api/v1/exercises/123"));
        assert!(!rule.matches(&Method::GET, "/api/v2/exercises"));
    }

    #[test]
    fn test_prefix_is_literal() {
        let rule = AccessRule::any("/api/users/", Requirement::Authenticated);
        assert!(rule.matches(&Method::GET, "/api/users/7/profile"));
        assert!(!rule.matches(&Method::GET, "/api/users"));
    }

    #[test]
    fn test_deserialize_rule() {
        let rule: AccessRule = serde_json::from_str(
            r#"{"method": "delete", "path_prefix": "/api/admin", "requirement": "admin_only"}"#,
        )
        .unwrap();
        assert_eq!(rule.method, MethodPattern::Exact(Method::DELETE));
        assert_eq!(rule.requirement, Requirement::AdminOnly);

        let rule: AccessRule =
            serde_json::from_str(r#"{"path_prefix": "/x", "requirement": "public"}"#).unwrap();
        assert_eq!(rule.method, MethodPattern::Any);
    }

    #[test]
    fn test_deserialize_rejects_unknown_requirement() {
        let result: Result<AccessRule, _> =
            serde_json::from_str(r#"{"path_prefix": "/x", "requirement": "owner"}"#);
        assert!(result.is_err());
    }
}
