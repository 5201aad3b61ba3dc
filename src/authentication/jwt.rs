use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::error::{ApiError, ApiResult};
use crate::schema::{Id, User};

/// Signing key for session tokens, built once from the configured secret.
#[derive(Clone)]
pub struct SessionKey(Hmac<Sha256>);

impl SessionKey {
    pub fn new(secret: &[u8]) -> Self {
        // HMAC-SHA256 accepts keys of any length.
        let mac = Hmac::new_from_slice(secret).expect("hmac key construction cannot fail");
        Self(mac)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            iat,
            exp,
        }
    }
}

/// Resolved request identity handed to every handler.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(claims: JwtSessionData) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

pub fn generate_jwt_session(user: &User, key: &SessionKey) -> ApiResult<String> {
    let claims = JwtSessionData::new(user.id, user.username.to_owned());

    claims
        .sign_with_key(&key.0)
        .map_err(|e| ApiError::Internal(format!("failed to sign session token: {e}")))
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<SessionData, ApiError> {
    let claims: JwtSessionData = token
        .verify_with_key(&key.0)
        .map_err(|_| ApiError::Unauthorized("invalid session token".to_string()))?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(ApiError::Unauthorized("session expired".to_string()));
    }

    Ok(SessionData::from(claims))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 42,
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: String::new(),
        }
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let key = SessionKey::new(b"test-secret");
        let token = generate_jwt_session(&user(), &key).unwrap();
        assert!(!token.is_empty());

        let session = verify_jwt_session(&token, &key).unwrap();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.username, "ada");
    }

    #[test]
    fn a_token_signed_with_another_key_is_rejected() {
        let token = generate_jwt_session(&user(), &SessionKey::new(b"one")).unwrap();
        assert!(verify_jwt_session(&token, &SessionKey::new(b"two")).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let key = SessionKey::new(b"test-secret");
        assert!(verify_jwt_session("not-a-token", &key).is_err());
    }
}
