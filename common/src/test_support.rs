//! Token fixtures for unit tests.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

pub const TEST_SECRET: &str = "unit-test-secret-0123456789abcdef";

/// Signs arbitrary claims with [`TEST_SECRET`] (HS256).
pub fn sign_json(claims: serde_json::Value) -> String {
    sign_json_with(TEST_SECRET.as_bytes(), claims)
}

pub fn sign_json_with(secret: &[u8], claims: serde_json::Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .expect("Failed to sign test token")
}

/// Valid token for one hour.
pub fn token_for(user_id: i64, username: &str, role: &str) -> String {
    token_signed_with(TEST_SECRET.as_bytes(), user_id, username, role)
}

pub fn token_signed_with(secret: &[u8], user_id: i64, username: &str, role: &str) -> String {
    sign_json_with(
        secret,
        serde_json::json!({
            "sub": username,
            "role": role,
            "userId": user_id,
            "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 3600,
        }),
    )
}

/// Correctly signed token that expired an hour ago.
pub fn expired_token_for(user_id: i64, username: &str, role: &str) -> String {
    sign_json(serde_json::json!({
        "sub": username,
        "role": role,
        "userId": user_id,
        "iat": Utc::now().timestamp() - 7200,
        "exp": Utc::now().timestamp() - 3600,
    }))
}
