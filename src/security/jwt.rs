use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::enums::Role;

/// Signed token payload: subject id, role, email, issued-at and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID in claims: {e}"))
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_minutes: i64,
}

impl TokenService {
    pub fn new(secret: &str, expires_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_minutes,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.expires_minutes)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode token: {e}"))
    }

    /// Any failure here (bad signature, expired, malformed) means the caller
    /// is unauthenticated.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| anyhow!("Token validation failed: {e}"))?;

        Ok(token_data.claims)
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> TokenService {
        TokenService::new("this-is-a-very-long-secret-key-for-testing-purposes-only", 60)
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service
            .issue(user_id, Role::Tech, "glorion@it.test")
            .expect("Failed to issue");
        let claims = service.decode(&token).expect("Decode failed");

        assert_eq!(claims.user_id().expect("Invalid user ID"), user_id);
        assert_eq!(claims.role, Role::Tech);
        assert_eq!(claims.email, "glorion@it.test");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = create_test_service();
        assert!(service.decode("invalid.token.here").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = create_test_service();
        let other = TokenService::new("a-completely-different-signing-secret-value", 60);

        let token = other
            .issue(Uuid::new_v4(), Role::Student, "newton@student.test")
            .expect("Failed to issue");
        assert!(service.decode(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative expiry puts exp well past the default validation leeway.
        let service = TokenService::new("this-is-a-very-long-secret-key-for-testing-purposes-only", -5);
        let token = service
            .issue(Uuid::new_v4(), Role::Admin, "bissombolo@it.test")
            .expect("Failed to issue");

        assert!(create_test_service().decode(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
