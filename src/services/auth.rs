use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::{BankerUser, User};
use crate::services::jwt::{AuthenticatedPrincipal, JwtManager, ROLE_BANKER, ROLE_USER};
use crate::utils::crypto::{sha256_hex, PasswordManager};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub const TOKEN_TTL_SECS: u64 = 86_400;

pub struct AuthService {
    jwt_manager: JwtManager,
    database: Arc<SqliteDatabase>,
}

impl AuthService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
        Self::with_secret(database, jwt_secret)
    }

    pub fn with_secret(database: Arc<SqliteDatabase>, jwt_secret: String) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            database,
        }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String> {
        let user = self
            .database
            .get_user_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| invalid_credentials())?;

        if !PasswordManager::verify_password(password, &user.password_hash)? {
            return Err(invalid_credentials());
        }

        self.issue_token(&user.id, &user.email, ROLE_USER).await
    }

    pub async fn login_banker(&self, email: &str, password: &str) -> Result<(String, BankerUser)> {
        let banker = self
            .database
            .get_banker_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| invalid_credentials())?;

        if !PasswordManager::verify_password(password, &banker.password_hash)? {
            return Err(invalid_credentials());
        }

        let token = self.issue_token(&banker.id, &banker.email, ROLE_BANKER).await?;
        Ok((token, banker))
    }

    /// Validate the JWT signature, then check the token registry so a
    /// logged-out token is dead even before it expires.
    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedPrincipal> {
        let token_data = self.jwt_manager.validate_token(token)?;
        let token_id = &token_data.claims.jti;

        if !self.database.is_token_valid(token_id).await? {
            return Err(AppError::AuthenticationError(
                "Token not found or inactive".to_string(),
            ));
        }

        AuthenticatedPrincipal::try_from(token_data.claims)
    }

    pub async fn require_user(&self, token: &str) -> Result<(AuthenticatedPrincipal, User)> {
        let principal = self.validate_token(token).await?;
        if principal.is_banker() {
            return Err(AppError::AuthenticationError(
                "A user account is required".to_string(),
            ));
        }
        let user = self.database.get_user_by_id(&principal.subject_id).await?;
        Ok((principal, user))
    }

    pub async fn require_banker(&self, token: &str) -> Result<AuthenticatedPrincipal> {
        let principal = self.validate_token(token).await?;
        if !principal.is_banker() {
            return Err(AppError::AuthenticationError(
                "Unauthorized banker".to_string(),
            ));
        }
        Ok(principal)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let token_data = self.jwt_manager.validate_token(token)?;
        self.database.revoke_token(&token_data.claims.jti).await?;
        Ok(())
    }

    async fn issue_token(&self, subject: &uuid::Uuid, email: &str, role: &str) -> Result<String> {
        let token = self.jwt_manager.generate_token(subject, email, role)?;

        let token_data = self.jwt_manager.validate_token(&token)?;
        let token_id = &token_data.claims.jti;
        let token_hash = sha256_hex(&token);
        let expires_at = Utc::now() + Duration::hours(24);

        self.database
            .store_user_token(subject, token_id, &token_hash, expires_at)
            .await?;
        let _ = self.database.cleanup_expired_tokens().await;

        Ok(token)
    }
}

fn invalid_credentials() -> AppError {
    AppError::AuthenticationError("Invalid email or password".to_string())
}
