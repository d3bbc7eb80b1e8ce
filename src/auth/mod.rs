use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

/// Claims minted by the identity provider. This service only verifies them;
/// it never issues tokens of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider user id. Primary key for profile lookups.
    pub sub: Uuid,
    pub email: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum JwtError {
    SecretNotConfigured,
    Expired,
    InvalidToken(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::SecretNotConfigured => write!(f, "JWT secret not configured"),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// Verify an identity-provider token against the configured shared secret.
pub fn verify_token(token: &str) -> Result<Claims, JwtError> {
    let auth = &config::config().auth;

    if auth.jwt_secret.is_empty() {
        return Err(JwtError::SecretNotConfigured);
    }

    verify_with(token, &auth.jwt_secret, &auth.jwt_audience, auth.leeway_secs)
}

fn verify_with(token: &str, secret: &str, audience: &str, leeway: u64) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.leeway = leeway;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(JwtError::Expired),
            _ => Err(JwtError::InvalidToken(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";
    const AUDIENCE: &str = "authenticated";

    fn mint(sub: Uuid, aud: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub,
            email: "person@example.com".to_string(),
            aud: aud.to_string(),
            exp: (now + Duration::seconds(exp_offset_secs)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = mint(user_id, AUDIENCE, 3600);

        let claims = verify_with(&token, SECRET, AUDIENCE, 0).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "person@example.com");
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = mint(Uuid::new_v4(), AUDIENCE, -3600);

        match verify_with(&token, SECRET, AUDIENCE, 0) {
            Err(JwtError::Expired) => {}
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = mint(Uuid::new_v4(), "something-else", 3600);

        assert!(matches!(
            verify_with(&token, SECRET, AUDIENCE, 0),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = mint(Uuid::new_v4(), AUDIENCE, 3600);

        assert!(matches!(
            verify_with(&token, "other-secret", AUDIENCE, 0),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            verify_with("not-a-jwt", SECRET, AUDIENCE, 0),
            Err(JwtError::InvalidToken(_))
        ));
    }
}
