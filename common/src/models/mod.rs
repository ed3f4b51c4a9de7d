//! Shared data models for the gateway.

pub mod access;
pub mod identity;

// Re-export commonly used types
pub use access::{AccessRule, MethodPattern, Requirement};
pub use identity::{Claims, Identity, IdentityExt, ADMIN_ROLE, ANONYMOUS_USERNAME, DEFAULT_ROLE};
