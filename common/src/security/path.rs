//! Request path hygiene.
//!
//! Access rules match the raw request path, while backends see whatever
//! their URL parser makes of it. Any path that a parser could rewrite into a
//! different one (dot segments, encoded separators, encoded characters that
//! never need encoding) is refused before the policy is consulted, so the
//! classified path is the path the backend receives.

use thiserror::Error;

/// Why a request path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path contains a '.' or '..' segment")]
    DotSegment,

    #[error("path contains a backslash")]
    Backslash,

    #[error("path contains an encoded '{0}'")]
    EncodedCharacter(char),

    #[error("path contains a malformed percent-encoding")]
    MalformedEncoding,
}

/// Characters that must appear literally in an accepted path.
///
/// RFC 3986 unreserved characters never need encoding, and `/`, `\` and `%`
/// change the meaning of the path once decoded.
fn must_be_literal(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '/' | '\\' | '%')
}

/// Accepts `path` only if no URL parser can rewrite it.
pub fn check_path(path: &str) -> Result<(), PathError> {
    if path.contains('\\') {
        return Err(PathError::Backslash);
    }

    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or(PathError::MalformedEncoding)?;
            let c = char::from(decoded);
            if must_be_literal(c) {
                return Err(PathError::EncodedCharacter(c));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PathError::DotSegment);
    }

    Ok(())
}
