use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_BANKER: &str = "banker";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn generate_token(&self, subject: &Uuid, email: &str, role: &str) -> Result<String> {
        let now = Utc::now();
        let expiration = now + Duration::hours(24);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }
}

/// Authenticated principal carried through a request once the bearer token
/// has been validated against both the signature and the token registry.
#[derive(Debug)]
pub struct AuthenticatedPrincipal {
    pub subject_id: Uuid,
    pub email: String,
    pub role: String,
    pub token_id: String,
}

impl AuthenticatedPrincipal {
    pub fn is_banker(&self) -> bool {
        self.role == ROLE_BANKER
    }
}

impl TryFrom<Claims> for AuthenticatedPrincipal {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        let subject_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::ValidationError(format!("Invalid subject ID in token: {}", e)))?;

        Ok(Self {
            subject_id,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_role() {
        let manager = JwtManager::new("test-jwt-secret".to_string());
        let id = Uuid::new_v4();
        let token = manager.generate_token(&id, "op@bank.example", ROLE_BANKER).unwrap();
        let data = manager.validate_token(&token).unwrap();
        let principal = AuthenticatedPrincipal::try_from(data.claims).unwrap();
        assert_eq!(principal.subject_id, id);
        assert!(principal.is_banker());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = JwtManager::new("secret-a".to_string())
            .generate_token(&Uuid::new_v4(), "a@b.co", ROLE_USER)
            .unwrap();
        assert!(JwtManager::new("secret-b".to_string())
            .validate_token(&token)
            .is_err());
    }
}
