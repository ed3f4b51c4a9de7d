//! Access policy and token verification.

pub mod path;
pub mod policy;
pub mod token;

pub use path::{check_path, PathError};
pub use policy::{PolicyMatcher, DEFAULT_REQUIREMENT};
pub use token::{JwtTokenVerifier, TokenError, TokenVerifier, MAX_TOKEN_SIZE_BYTES};
