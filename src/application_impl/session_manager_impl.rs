use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_ttl: Duration,
    /// Upper bound for one operation, store round trips included.
    pub op_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

/// Session manager backed by a shared [`SessionRepo`]. Holds no mutable
/// state, so one instance serves every request handler.
pub struct RealSessionManager {
    session_repo: Arc<dyn SessionRepo>,
    token_codec: Arc<dyn TokenCodec>,
    cfg: SessionConfig,
}

impl RealSessionManager {
    pub fn new(
        session_repo: Arc<dyn SessionRepo>,
        token_codec: Arc<dyn TokenCodec>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            session_repo,
            token_codec,
            cfg,
        }
    }

    async fn with_deadline<T>(
        &self,
        op: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.cfg.op_timeout, op)
            .await
            .map_err(|_| AuthError::Timeout)?
    }

    /// Rotate the user's session to a fresh refresh token, then sign the
    /// access token. If signing fails the new session is discarded again.
    async fn issue(
        &self,
        user_id: UserId,
        superseded: Option<&Fingerprint>,
    ) -> Result<TokenPair, AuthError> {
        let refresh_token = RefreshToken::generate();
        let refresh_fp = refresh_token.fingerprint();
        let refresh_exp = Utc::now() + self.cfg.refresh_ttl;

        self.session_repo
            .replace_session(&user_id, &refresh_fp, superseded, self.cfg.refresh_ttl)
            .await?;

        let (access_token, access_exp) = match self.token_codec.issue_access_token(&user_id).await
        {
            Ok(issued) => issued,
            Err(e) => {
                if let Err(cleanup) = self.session_repo.discard_session(&user_id, &refresh_fp).await
                {
                    error!(%user_id, error = %cleanup, "discarding unissued session failed");
                }
                return Err(e);
            }
        };

        info!(%user_id, "session issued");
        Ok(TokenPair {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Blacklist `at` for whatever is left of its lifetime. Nothing to do once
    /// it has expired on its own.
    async fn blacklist_until(
        &self,
        at: &AccessToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let remaining = match (expires_at - Utc::now()).to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => return Ok(()),
        };
        self.session_repo
            .blacklist_access(&at.fingerprint(), remaining)
            .await
    }
}

fn into_refresh_error(e: AuthError) -> AuthError {
    match e {
        AuthError::Store(msg) => AuthError::TokenRefresh(msg),
        other => other,
    }
}

#[async_trait::async_trait]
impl SessionManager for RealSessionManager {
    async fn generate_tokens(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        if user_id.is_empty() {
            return Err(AuthError::EmptyUserId);
        }
        self.with_deadline(self.issue(UserId::from(user_id), None))
            .await
    }

    async fn refresh_token(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError> {
        if old_refresh_token.is_empty() {
            return Err(AuthError::EmptyRefreshToken);
        }
        let old_fp = Fingerprint::of(old_refresh_token);

        self.with_deadline(async {
            let check = self
                .session_repo
                .check_refresh(&old_fp)
                .await
                .map_err(into_refresh_error)?;

            match check {
                RefreshCheck::NotFound => Err(AuthError::InvalidRefreshToken),
                RefreshCheck::Mismatch(user_id) => {
                    warn!(%user_id, "superseded refresh token presented, session revoked");
                    Err(AuthError::TokenRevoked)
                }
                RefreshCheck::Active(user_id) => self
                    .issue(user_id, Some(&old_fp))
                    .await
                    .map_err(into_refresh_error),
            }
        })
        .await
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::InvalidAccessToken);
        }
        let access_token = AccessToken(access_token.to_string());
        let refresh_fp = (!refresh_token.is_empty()).then(|| Fingerprint::of(refresh_token));

        self.with_deadline(async {
            let claims = self.token_codec.inspect_access_token(&access_token).await?;

            // Both steps are attempted; the first failure is reported.
            let blacklisted = self.blacklist_until(&access_token, claims.expires_at).await;
            if let Err(e) = &blacklisted {
                warn!(user_id = %claims.user_id, error = %e, "blacklisting access token failed");
            }
            let deleted = self
                .session_repo
                .delete_session(&claims.user_id, refresh_fp.as_ref())
                .await;
            if let Err(e) = &deleted {
                warn!(user_id = %claims.user_id, error = %e, "deleting session failed");
            }

            blacklisted.and(deleted)?;
            info!(user_id = %claims.user_id, "logged out");
            Ok(())
        })
        .await
    }

    async fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidAccessToken);
        }
        let token = AccessToken(token.to_string());

        self.with_deadline(async {
            if self.session_repo.is_blacklisted(&token.fingerprint()).await? {
                return Err(AuthError::TokenRevoked);
            }
            let verified = self.token_codec.verify_access_token(&token).await?;
            Ok(verified.user_id)
        })
        .await
    }
}
