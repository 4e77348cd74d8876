use super::credential_store_redis::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use redis::Script;
use std::time::Duration;

const REPLACE_SESSION: &str = include_str!("replace_session.lua");
const REFRESH_CHECK: &str = include_str!("refresh_check.lua");
const DISCARD_SESSION: &str = include_str!("discard_session.lua");
const DELETE_SESSION: &str = include_str!("delete_session.lua");

pub struct RedisSessionRepo {
    store: RedisCredentialStore,
    keys: SessionKeys,
    replace_session: Script,
    refresh_check: Script,
    discard_session: Script,
    delete_session: Script,
}

impl RedisSessionRepo {
    pub fn new(store: RedisCredentialStore, keys: SessionKeys) -> Self {
        RedisSessionRepo {
            store,
            keys,
            replace_session: Script::new(REPLACE_SESSION),
            refresh_check: Script::new(REFRESH_CHECK),
            discard_session: Script::new(DISCARD_SESSION),
            delete_session: Script::new(DELETE_SESSION),
        }
    }
}

#[async_trait::async_trait]
impl SessionRepo for RedisSessionRepo {
    async fn replace_session(
        &self,
        user_id: &UserId,
        new_rt: &Fingerprint,
        superseded: Option<&Fingerprint>,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let record_key = self.keys.refresh_token(new_rt);
        let ttl_ms = ttl_millis(ttl).to_string();
        let superseded = superseded.map(Fingerprint::as_str).unwrap_or("");
        let record_prefix = self.keys.refresh_token_prefix();
        let retired_prefix = self.keys.retired_refresh_token_prefix();

        let _: i64 = self
            .store
            .run_script(
                &self.replace_session,
                &[session_key.as_str(), record_key.as_str()],
                &[
                    new_rt.as_str(),
                    user_id.as_str(),
                    ttl_ms.as_str(),
                    superseded,
                    record_prefix.as_str(),
                    retired_prefix.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn check_refresh(&self, rt: &Fingerprint) -> Result<RefreshCheck, AuthError> {
        let record_key = self.keys.refresh_token(rt);
        let retired_key = self.keys.retired_refresh_token(rt);
        let session_prefix = self.keys.user_session_prefix();

        let (status, owner): (i64, String) = self
            .store
            .run_script(
                &self.refresh_check,
                &[record_key.as_str(), retired_key.as_str()],
                &[rt.as_str(), session_prefix.as_str()],
            )
            .await?;

        match status {
            0 => Ok(RefreshCheck::NotFound),
            1 => Ok(RefreshCheck::Active(UserId(owner))),
            2 => Ok(RefreshCheck::Mismatch(UserId(owner))),
            other => Err(AuthError::Store(format!(
                "unknown refresh check status {}",
                other
            ))),
        }
    }

    async fn discard_session(
        &self,
        user_id: &UserId,
        rt: &Fingerprint,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let record_key = self.keys.refresh_token(rt);
        let _: i64 = self
            .store
            .run_script(
                &self.discard_session,
                &[session_key.as_str(), record_key.as_str()],
                &[rt.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn delete_session(
        &self,
        user_id: &UserId,
        rt: Option<&Fingerprint>,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let supplied = rt.map(Fingerprint::as_str).unwrap_or("");
        let record_prefix = self.keys.refresh_token_prefix();
        let _: i64 = self
            .store
            .run_script(
                &self.delete_session,
                &[session_key.as_str()],
                &[supplied, user_id.as_str(), record_prefix.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn blacklist_access(&self, at: &Fingerprint, ttl: Duration) -> Result<(), AuthError> {
        self.store
            .set_with_ttl(&self.keys.blacklist(at), "1", ttl)
            .await
    }

    async fn is_blacklisted(&self, at: &Fingerprint) -> Result<bool, AuthError> {
        self.store.exists(&self.keys.blacklist(at)).await
    }
}
