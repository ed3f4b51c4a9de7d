//! Shared building blocks for the API gateway.
//!
//! - `config`: environment-driven configuration
//! - `errors`: the gateway error taxonomy and its HTTP mapping
//! - `models`: identity, claims and access-rule types
//! - `security`: policy matching and bearer-token verification
//! - `middleware`: the request admission pipeline and request IDs
//! - `response`: the JSON envelope used by gateway-owned endpoints

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod security;

#[cfg(test)]
pub(crate) mod test_support;
