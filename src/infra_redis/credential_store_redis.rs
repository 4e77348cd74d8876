use crate::application_port::AuthError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, FromRedisValue, RedisError, Script};
use std::time::Duration;

/// Thin client over the shared key-value store. Knows nothing about key
/// families; that is the session repository's job.
#[derive(Clone)]
pub struct RedisCredentialStore {
    conn: ConnectionManager,
}

pub(crate) fn store_error(e: RedisError) -> AuthError {
    AuthError::Store(e.to_string())
}

/// Millisecond TTL for `PX`, which rejects zero.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl RedisCredentialStore {
    pub async fn connect(url: &str) -> Result<Self, AuthError> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(store_error)?;
        Ok(RedisCredentialStore { conn })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(store_error)
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(key, value, ttl_millis(ttl))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(store_error)
    }

    /// Runs `script` as one indivisible step on the server (`EVALSHA`, falling
    /// back to `EVAL` when the script is not cached yet).
    pub async fn run_script<T: FromRedisValue>(
        &self,
        script: &Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<T, AuthError> {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(*arg);
        }
        let mut conn = self.conn.clone();
        invocation.invoke_async(&mut conn).await.map_err(store_error)
    }
}
