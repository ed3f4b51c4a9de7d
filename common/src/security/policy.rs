//! Path/method access policy.
//!
//! The rule table is scanned top to bottom and the first matching rule wins.
//! There is no longest-match: a narrower rule placed after a broader one never
//! applies. Requests matching no rule are [`Requirement::Authenticated`].

use std::path::Path;

use axum::http::Method;

use crate::config::ConfigError;
use crate::models::{AccessRule, Requirement};

/// Requirement applied when no rule matches.
pub const DEFAULT_REQUIREMENT: Requirement = Requirement::Authenticated;

/// Authentication and gateway endpoints open to any method.
const PUBLIC_ENDPOINTS: [&str; 7] = [
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh",
    "/actuator/health",
    "/gateway/health",
    "/gateway/info",
    "/gateway/routes",
];

/// Catalogs readable without a token. GET only.
const PUBLIC_READ_PREFIXES: [&str; 4] = [
    "/api/v1/exercises",
    "/api/v1/muscle-groups",
    "/api/v1/workout-plans/public",
    "/api/v1/routine-folders/public",
];

const ADMIN_PREFIXES: [&str; 1] = ["/api/admin"];

/// Catalogs whose mutations are reserved to administrators.
const ADMIN_MUTATION_PREFIXES: [&str; 2] = ["/api/v1/exercises", "/api/v1/muscle-groups"];

const AUTHENTICATED_PREFIXES: [&str; 10] = [
    "/api/v1/workouts",
    "/api/v1/analytics",
    "/api/v1/workout-plans/personal",
    "/api/v1/workout-plans/my-created",
    "/api/v1/routine-folders/personal",
    "/api/badges",
    "/api/champions",
    "/api/quests",
    "/api/users/",
    "/api/v1/users",
];

/// Classifies requests against an ordered [`AccessRule`] table.
#[derive(Debug, Clone)]
pub struct PolicyMatcher {
    rules: Vec<AccessRule>,
}

impl Default for PolicyMatcher {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}

impl PolicyMatcher {
    /// Creates a matcher over `rules`, evaluated in the given order.
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Loads the rule table from a JSON array of rules.
    ///
    /// # Errors
    /// Returns `ConfigError::RulesFile` if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|e| ConfigError::RulesFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Parses a rule table from JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let rules: Vec<AccessRule> = serde_json::from_str(raw)?;
        Ok(Self::new(rules))
    }

    /// The production rule table.
    ///
    /// Order: public endpoints, public read-only catalogs (GET), admin
    /// namespace, admin catalog mutations, authenticated namespaces.
    pub fn default_rules() -> Vec<AccessRule> {
        let mut rules = Vec::new();

        for prefix in PUBLIC_ENDPOINTS {
            rules.push(AccessRule::any(prefix, Requirement::Public));
        }
        for prefix in PUBLIC_READ_PREFIXES {
            rules.push(AccessRule::method(Method::GET, prefix, Requirement::Public));
        }
        for prefix in ADMIN_PREFIXES {
            rules.push(AccessRule::any(prefix, Requirement::AdminOnly));
        }
        for prefix in ADMIN_MUTATION_PREFIXES {
            for method in [Method::POST, Method::PUT, Method::DELETE] {
                rules.push(AccessRule::method(method, prefix, Requirement::AdminOnly));
            }
        }
        for prefix in AUTHENTICATED_PREFIXES {
            rules.push(AccessRule::any(prefix, Requirement::Authenticated));
        }

        rules
    }

    /// Returns the requirement of the first rule matching `method` and `path`.
    ///
    /// `path` must not include the query string.
    pub fn classify(&self, method: &Method, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.requirement)
            .unwrap_or(DEFAULT_REQUIREMENT)
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PolicyMatcher {
        PolicyMatcher::default()
    }

    #[test]
    fn test_public_endpoints_any_method() {
        let m = matcher();
        for method in [Method::GET, Method::POST, Method::DELETE] {
            assert_eq!(m.classify(&method, "/gateway/health"), Requirement::Public);
            assert_eq!(m.classify(&method, "/api/v1/auth/login"), Requirement::Public);
        }
        assert_eq!(m.classify(&Method::GET, "/actuator/health"), Requirement::Public);
    }

    #[test]
    fn test_other_auth_routes_are_not_public() {
        assert_eq!(
            matcher().classify(&Method::POST, "/api/v1/auth/logout"),
            Requirement::Authenticated
        );
    }

    #[test]
    fn test_public_read_is_get_only() {
        let m = matcher();
        assert_eq!(m.classify(&Method::GET, "/api/v1/exercises/123"), Requirement::Public);
        assert_eq!(m.classify(&Method::POST, "/api/v1/exercises/123"), Requirement::AdminOnly);
        assert_eq!(m.classify(&Method::PUT, "/api/v1/muscle-groups/1"), Requirement::AdminOnly);
        assert_eq!(
            m.classify(&Method::DELETE, "/api/v1/muscle-groups/1"),
            Requirement::AdminOnly
        );
        // PATCH is not an admin mutation rule and falls to the default.
        assert_eq!(
            m.classify(&Method::PATCH, "/api/v1/exercises/1"),
            Requirement::Authenticated
        );
        assert_eq!(
            m.classify(&Method::GET, "/api/v1/routine-folders/public/3"),
            Requirement::Public
        );
    }

    #[test]
    fn test_admin_namespace() {
        let m = matcher();
        assert_eq!(m.classify(&Method::GET, "/api/admin/data"), Requirement::AdminOnly);
        assert_eq!(m.classify(&Method::POST, "/api/admin"), Requirement::AdminOnly);
    }

    #[test]
    fn test_authenticated_and_default() {
        let m = matcher();
        assert_eq!(m.classify(&Method::GET, "/api/v1/workouts/9"), Requirement::Authenticated);
        assert_eq!(m.classify(&Method::GET, "/api/users/9/streaks"), Requirement::Authenticated);
        assert_eq!(m.classify(&Method::GET, "/unknown/path"), Requirement::Authenticated);
    }

    #[test]
    fn test_public_read_precedes_authenticated_prefix() {
        let m = PolicyMatcher::new(vec![
            AccessRule::method(Method::GET, "/api/v1/workout-plans", Requirement::Public),
            AccessRule::any("/api/v1/workout-plans/personal", Requirement::Authenticated),
        ]);
        assert_eq!(
            m.classify(&Method::GET, "/api/v1/workout-plans/personal/1"),
            Requirement::Public
        );
        assert_eq!(
            m.classify(&Method::POST, "/api/v1/workout-plans/personal/1"),
            Requirement::Authenticated
        );
    }

    #[test]
    fn test_narrower_later_rule_never_overrides() {
        let m = PolicyMatcher::new(vec![
            AccessRule::any("/api", Requirement::Authenticated),
            AccessRule::any("/api/admin", Requirement::AdminOnly),
        ]);
        assert_eq!(m.classify(&Method::GET, "/api/admin/x"), Requirement::Authenticated);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let m = matcher();
        let first = m.classify(&Method::GET, "/api/v1/muscle-groups");
        for _ in 0..10 {
            assert_eq!(m.classify(&Method::GET, "/api/v1/muscle-groups"), first);
        }
    }

    #[test]
    fn test_from_json_preserves_order() {
        let m = PolicyMatcher::from_json(
            r#"[
                {"method": "GET", "path_prefix": "/a", "requirement": "public"},
                {"path_prefix": "/a", "requirement": "admin_only"}
            ]"#,
        )
        .unwrap();
        assert_eq!(m.rules().len(), 2);
        assert_eq!(m.classify(&Method::GET, "/a/b"), Requirement::Public);
        assert_eq!(m.classify(&Method::POST, "/a/b"), Requirement::AdminOnly);
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = PolicyMatcher::from_json_file(Path::new("/nonexistent/rules.json"));
        assert!(matches!(result, Err(ConfigError::RulesFile { .. })));
    }
}
