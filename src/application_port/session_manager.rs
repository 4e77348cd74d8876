use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("empty user id")]
    EmptyUserId,
    #[error("empty refresh token")]
    EmptyRefreshToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("invalid access token")]
    InvalidAccessToken,
    #[error("invalid token format")]
    InvalidTokenFormat,
    #[error("token generation failed: {0}")]
    TokenGeneration(String),
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),
    #[error("token has been revoked")]
    TokenRevoked,
    #[error("token not found")]
    TokenNotFound,
    #[error("store error: {0}")]
    Store(String),
    #[error("operation timed out")]
    Timeout,
}

/// How a caller should surface an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Unavailable,
    Internal,
}

impl AuthError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::EmptyUserId | AuthError::EmptyRefreshToken => ErrorClass::BadRequest,
            AuthError::InvalidRefreshToken
            | AuthError::InvalidAccessToken
            | AuthError::InvalidTokenFormat
            | AuthError::TokenRevoked
            | AuthError::TokenNotFound => ErrorClass::Unauthorized,
            AuthError::Store(_) | AuthError::Timeout | AuthError::TokenRefresh(_) => {
                ErrorClass::Unavailable
            }
            AuthError::TokenGeneration(_) => ErrorClass::Internal,
        }
    }

    /// Whether the same call may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Unavailable
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies stateless access tokens.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        user: &UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    /// Full verification: algorithm, signature and expiry.
    async fn verify_access_token(&self, token: &AccessToken)
    -> Result<TokenVerifyResult, AuthError>;
    /// Algorithm and signature only. An expired token still yields its claims.
    async fn inspect_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError>;
}

#[async_trait::async_trait]
pub trait SessionManager: Send + Sync {
    async fn generate_tokens(&self, user_id: &str) -> Result<TokenPair, AuthError>;
    async fn refresh_token(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError>;
    async fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError>;
}
