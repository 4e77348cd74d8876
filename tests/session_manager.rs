use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sessionward::application_impl::*;
use sessionward::application_port::*;
use sessionward::domain_model::*;
use sessionward::domain_port::*;
use sessionward::infra_memory::MemorySessionRepo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SECRET: &[u8] = b"integration-test-signing-key-0123456789";

fn codec(access_ttl: Duration) -> Arc<JwtHmacCodec> {
    Arc::new(JwtHmacCodec::new(JwtConfig {
        algorithm: HmacAlgorithm::HS256,
        access_ttl,
        signing_key: SECRET.to_vec(),
    }))
}

fn manager(repo: Arc<dyn SessionRepo>) -> RealSessionManager {
    RealSessionManager::new(repo, codec(Duration::from_secs(900)), SessionConfig::default())
}

fn memory_manager() -> (Arc<MemorySessionRepo>, RealSessionManager) {
    let repo = Arc::new(MemorySessionRepo::default());
    (repo.clone(), manager(repo))
}

#[tokio::test]
async fn generated_access_token_validates_to_its_user() {
    let (_, manager) = memory_manager();

    for user in ["u1", "42", "user@example.com", "ユーザー"] {
        let pair = manager.generate_tokens(user).await.unwrap();
        let user_id = manager
            .validate_access_token(&pair.access_token.0)
            .await
            .unwrap();
        assert_eq!(user_id.as_str(), user);
        assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
    }
}

#[tokio::test]
async fn second_login_revokes_the_first_refresh_token() {
    let (repo, manager) = memory_manager();

    let first = manager.generate_tokens("u1").await.unwrap();
    let second = manager.generate_tokens("u1").await.unwrap();

    assert!(matches!(
        manager.refresh_token(&first.refresh_token.0).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(
        !repo
            .contains(&repo.keys().user_session(&UserId::from("u1")))
            .await
    );
    assert!(manager.refresh_token(&second.refresh_token.0).await.is_err());
}

#[tokio::test]
async fn a_refresh_token_can_only_be_used_once() {
    let (_, manager) = memory_manager();
    let initial = manager.generate_tokens("u1").await.unwrap();

    let rotated = manager
        .refresh_token(&initial.refresh_token.0)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, initial.refresh_token);

    for _ in 0..3 {
        assert!(manager.refresh_token(&initial.refresh_token.0).await.is_err());
    }
}

#[tokio::test]
async fn rotation_then_reuse_scenario() {
    let (_, manager) = memory_manager();

    let pair1 = manager.generate_tokens("u1").await.unwrap();
    let pair2 = manager.refresh_token(&pair1.refresh_token.0).await.unwrap();
    assert_ne!(pair1.refresh_token, pair2.refresh_token);
    assert_ne!(pair1.access_token, pair2.access_token);

    assert!(matches!(
        manager.refresh_token(&pair1.refresh_token.0).await,
        Err(AuthError::TokenRevoked)
    ));

    // Reuse detection ends refresh capability, not outstanding access tokens.
    let user_id = manager
        .validate_access_token(&pair2.access_token.0)
        .await
        .unwrap();
    assert_eq!(user_id.as_str(), "u1");
    assert!(matches!(
        manager.refresh_token(&pair2.refresh_token.0).await,
        Err(AuthError::TokenRevoked)
    ));
}

#[tokio::test]
async fn reuse_by_one_user_leaves_other_sessions_alone() {
    let (_, manager) = memory_manager();

    let alice = manager.generate_tokens("alice").await.unwrap();
    let bob = manager.generate_tokens("bob").await.unwrap();
    manager.refresh_token(&bob.refresh_token.0).await.unwrap();
    assert!(manager.refresh_token(&bob.refresh_token.0).await.is_err());

    assert!(manager.refresh_token(&alice.refresh_token.0).await.is_ok());
}

#[tokio::test]
async fn unknown_refresh_token_is_invalid() {
    let (_, manager) = memory_manager();
    let stranger = RefreshToken::generate();

    assert!(matches!(
        manager.refresh_token(&stranger.0).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn logout_revokes_a_still_valid_access_token() {
    let (_, manager) = memory_manager();
    let pair = manager.generate_tokens("u1").await.unwrap();

    manager
        .logout(&pair.access_token.0, &pair.refresh_token.0)
        .await
        .unwrap();

    assert!(matches!(
        manager.validate_access_token(&pair.access_token.0).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(matches!(
        manager.refresh_token(&pair.refresh_token.0).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn blacklist_entry_never_outlives_the_access_token() {
    let repo = Arc::new(MemorySessionRepo::default());
    let manager = RealSessionManager::new(
        repo.clone(),
        codec(Duration::from_secs(60)),
        SessionConfig::default(),
    );
    let pair = manager.generate_tokens("u1").await.unwrap();

    manager.logout(&pair.access_token.0, "").await.unwrap();

    let key = repo.keys().blacklist(&pair.access_token.fingerprint());
    let ttl = repo.ttl(&key).await.expect("blacklist entry written");
    let remaining = (pair.access_token_expires_at - Utc::now())
        .to_std()
        .unwrap_or_default();
    assert!(ttl <= remaining + Duration::from_millis(5));
    assert!(ttl <= Duration::from_secs(60));
}

#[tokio::test]
async fn logout_in_the_last_second_still_revokes() {
    let manager = RealSessionManager::new(
        Arc::new(MemorySessionRepo::default()),
        codec(Duration::from_secs(1)),
        SessionConfig::default(),
    );
    let pair = manager.generate_tokens("u1").await.unwrap();

    while Utc::now() < pair.access_token_expires_at {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    manager.logout(&pair.access_token.0, "").await.unwrap();

    assert!(
        manager
            .validate_access_token(&pair.access_token.0)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn logout_without_refresh_token_ends_the_current_session() {
    let (repo, manager) = memory_manager();
    let pair = manager.generate_tokens("u1").await.unwrap();

    manager.logout(&pair.access_token.0, "").await.unwrap();

    assert!(
        !repo
            .contains(&repo.keys().refresh_token(&pair.refresh_token.fingerprint()))
            .await
    );
    assert!(manager.refresh_token(&pair.refresh_token.0).await.is_err());
}

#[tokio::test]
async fn logout_twice_is_not_an_error() {
    let (_, manager) = memory_manager();
    let pair = manager.generate_tokens("u1").await.unwrap();

    manager
        .logout(&pair.access_token.0, &pair.refresh_token.0)
        .await
        .unwrap();
    manager
        .logout(&pair.access_token.0, &pair.refresh_token.0)
        .await
        .unwrap();
}

#[tokio::test]
async fn logout_rejects_tokens_signed_with_another_key() {
    let (repo, manager) = memory_manager();
    let foreign = JwtHmacCodec::new(JwtConfig {
        algorithm: HmacAlgorithm::HS256,
        access_ttl: Duration::from_secs(900),
        signing_key: b"somebody-elses-signing-key-000000000".to_vec(),
    });
    let (forged, _) = foreign
        .issue_access_token(&UserId::from("u1"))
        .await
        .unwrap();

    assert!(matches!(
        manager.logout(&forged.0, "").await,
        Err(AuthError::InvalidAccessToken)
    ));
    assert!(
        !repo
            .contains(&repo.keys().blacklist(&forged.fingerprint()))
            .await
    );
}

#[tokio::test]
async fn empty_inputs_are_rejected() {
    let (_, manager) = memory_manager();

    assert!(matches!(
        manager.generate_tokens("").await,
        Err(AuthError::EmptyUserId)
    ));
    assert!(matches!(
        manager.refresh_token("").await,
        Err(AuthError::EmptyRefreshToken)
    ));
    assert!(matches!(
        manager.logout("", "").await,
        Err(AuthError::InvalidAccessToken)
    ));
    assert!(matches!(
        manager.validate_access_token("").await,
        Err(AuthError::InvalidAccessToken)
    ));
}

#[tokio::test]
async fn malformed_access_tokens_are_invalid() {
    let (_, manager) = memory_manager();

    for raw in ["garbage", "a.b.c", "Bearer x"] {
        assert!(matches!(
            manager.validate_access_token(raw).await,
            Err(AuthError::InvalidAccessToken)
        ));
        assert!(matches!(
            manager.logout(raw, "").await,
            Err(AuthError::InvalidAccessToken)
        ));
    }
}

#[tokio::test]
async fn racing_refreshes_never_leave_two_live_sessions() {
    let (_, manager) = memory_manager();
    let manager = Arc::new(manager);
    let initial = manager.generate_tokens("u1").await.unwrap();

    let (a, b) = tokio::join!(
        manager.refresh_token(&initial.refresh_token.0),
        manager.refresh_token(&initial.refresh_token.0)
    );
    assert!(a.is_ok() || b.is_ok());

    let mut usable = 0;
    for pair in [a, b].into_iter().flatten() {
        if manager.refresh_token(&pair.refresh_token.0).await.is_ok() {
            usable += 1;
        }
    }
    assert!(usable <= 1);
    assert!(manager.refresh_token(&initial.refresh_token.0).await.is_err());
}

// region collaborators that misbehave

/// Codec whose signing always fails.
struct BrokenSigner;

#[async_trait::async_trait]
impl TokenCodec for BrokenSigner {
    async fn issue_access_token(
        &self,
        _user: &UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        Err(AuthError::TokenGeneration("signing key unavailable".into()))
    }

    async fn verify_access_token(
        &self,
        _token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        Err(AuthError::InvalidAccessToken)
    }

    async fn inspect_access_token(
        &self,
        _token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        Err(AuthError::InvalidAccessToken)
    }
}

/// Codec that accepts anything and reports it as already expired.
struct ExpiredTokens;

#[async_trait::async_trait]
impl TokenCodec for ExpiredTokens {
    async fn issue_access_token(
        &self,
        _user: &UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        Ok((AccessToken("expired".into()), Utc::now()))
    }

    async fn verify_access_token(
        &self,
        _token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        Err(AuthError::InvalidAccessToken)
    }

    async fn inspect_access_token(
        &self,
        _token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        Ok(TokenVerifyResult {
            user_id: UserId::from("u1"),
            expires_at: Utc::now() - ChronoDuration::minutes(1),
        })
    }
}

/// Wraps the memory repository and injects failures or delays.
struct FaultyRepo {
    inner: MemorySessionRepo,
    fail_all: AtomicBool,
    fail_blacklist: AtomicBool,
    delay: Duration,
}

impl FaultyRepo {
    fn new() -> Self {
        FaultyRepo {
            inner: MemorySessionRepo::default(),
            fail_all: AtomicBool::new(false),
            fail_blacklist: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    async fn gate(&self) -> Result<(), AuthError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AuthError::Store("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionRepo for FaultyRepo {
    async fn replace_session(
        &self,
        user_id: &UserId,
        new_rt: &Fingerprint,
        superseded: Option<&Fingerprint>,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        self.gate().await?;
        self.inner
            .replace_session(user_id, new_rt, superseded, ttl)
            .await
    }

    async fn check_refresh(&self, rt: &Fingerprint) -> Result<RefreshCheck, AuthError> {
        self.gate().await?;
        self.inner.check_refresh(rt).await
    }

    async fn discard_session(
        &self,
        user_id: &UserId,
        rt: &Fingerprint,
    ) -> Result<(), AuthError> {
        self.gate().await?;
        self.inner.discard_session(user_id, rt).await
    }

    async fn delete_session(
        &self,
        user_id: &UserId,
        rt: Option<&Fingerprint>,
    ) -> Result<(), AuthError> {
        self.gate().await?;
        self.inner.delete_session(user_id, rt).await
    }

    async fn blacklist_access(&self, at: &Fingerprint, ttl: Duration) -> Result<(), AuthError> {
        self.gate().await?;
        if self.fail_blacklist.load(Ordering::SeqCst) {
            return Err(AuthError::Store("blacklist write rejected".into()));
        }
        self.inner.blacklist_access(at, ttl).await
    }

    async fn is_blacklisted(&self, at: &Fingerprint) -> Result<bool, AuthError> {
        self.gate().await?;
        self.inner.is_blacklisted(at).await
    }
}

// endregion

#[tokio::test]
async fn signing_failure_discards_the_new_session() {
    let repo = Arc::new(MemorySessionRepo::default());
    let manager = RealSessionManager::new(
        repo.clone(),
        Arc::new(BrokenSigner),
        SessionConfig::default(),
    );

    assert!(matches!(
        manager.generate_tokens("u1").await,
        Err(AuthError::TokenGeneration(_))
    ));
    assert!(
        !repo
            .contains(&repo.keys().user_session(&UserId::from("u1")))
            .await
    );
}

#[tokio::test]
async fn logout_with_expired_token_skips_the_blacklist() {
    let repo = Arc::new(MemorySessionRepo::default());
    let manager = RealSessionManager::new(
        repo.clone(),
        Arc::new(ExpiredTokens),
        SessionConfig::default(),
    );
    let pair = manager.generate_tokens("u1").await.unwrap();

    manager
        .logout(&pair.access_token.0, &pair.refresh_token.0)
        .await
        .unwrap();

    assert!(
        !repo
            .contains(&repo.keys().blacklist(&pair.access_token.fingerprint()))
            .await
    );
    assert!(
        !repo
            .contains(&repo.keys().user_session(&UserId::from("u1")))
            .await
    );
}

#[tokio::test]
async fn store_outage_is_retryable_not_an_auth_failure() {
    let repo = Arc::new(FaultyRepo::new());
    let manager = manager(repo.clone());
    let pair = manager.generate_tokens("u1").await.unwrap();

    repo.fail_all.store(true, Ordering::SeqCst);

    let refresh = manager.refresh_token(&pair.refresh_token.0).await;
    assert!(matches!(refresh, Err(AuthError::TokenRefresh(_))));
    assert!(refresh.unwrap_err().is_retryable());

    let validate = manager.validate_access_token(&pair.access_token.0).await;
    assert!(matches!(validate, Err(AuthError::Store(_))));

    let generate = manager.generate_tokens("u2").await;
    assert!(generate.unwrap_err().is_retryable());

    repo.fail_all.store(false, Ordering::SeqCst);
    assert!(manager.refresh_token(&pair.refresh_token.0).await.is_ok());
}

#[tokio::test]
async fn logout_still_deletes_the_session_when_blacklisting_fails() {
    let repo = Arc::new(FaultyRepo::new());
    let manager = manager(repo.clone());
    let pair = manager.generate_tokens("u1").await.unwrap();

    repo.fail_blacklist.store(true, Ordering::SeqCst);
    assert!(matches!(
        manager
            .logout(&pair.access_token.0, &pair.refresh_token.0)
            .await,
        Err(AuthError::Store(_))
    ));

    assert!(matches!(
        manager.refresh_token(&pair.refresh_token.0).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out() {
    let mut repo = FaultyRepo::new();
    repo.delay = Duration::from_secs(30);
    let manager = RealSessionManager::new(
        Arc::new(repo),
        codec(Duration::from_secs(900)),
        SessionConfig {
            op_timeout: Duration::from_secs(5),
            ..SessionConfig::default()
        },
    );

    let err = manager.generate_tokens("u1").await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout));
    assert!(err.is_retryable());
}
