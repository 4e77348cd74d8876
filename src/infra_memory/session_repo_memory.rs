use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Entry count below which writes never trigger a sweep.
const SWEEP_FLOOR: usize = 1024;

/// Keyspace with per-key expiry. Expired entries are dropped on access, and
/// swept in bulk whenever the map doubles past its size after the last sweep.
struct Keyspace {
    entries: HashMap<String, Entry>,
    sweep_at: usize,
}

impl Default for Keyspace {
    fn default() -> Self {
        Keyspace {
            entries: HashMap::new(),
            sweep_at: SWEEP_FLOOR,
        }
    }
}

impl Keyspace {
    fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&mut self, key: String, value: impl Into<String>, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            },
        );
        if self.entries.len() >= self.sweep_at {
            self.sweep();
        }
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.sweep_at = (self.entries.len() * 2).max(SWEEP_FLOOR);
    }

    fn del(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn ttl(&mut self, key: &str) -> Option<Duration> {
        self.get(key)?;
        self.entries
            .get(key)
            .map(|entry| entry.expires_at.saturating_duration_since(Instant::now()))
    }
}

/// Single-process session repository. The whole keyspace sits behind one
/// lock, so each method is as indivisible as its store script counterpart.
/// Suitable for development and tests; replicas do not share it.
pub struct MemorySessionRepo {
    keys: SessionKeys,
    keyspace: Mutex<Keyspace>,
}

impl MemorySessionRepo {
    pub fn new(keys: SessionKeys) -> Self {
        MemorySessionRepo {
            keys,
            keyspace: Mutex::new(Keyspace::default()),
        }
    }

    /// Remaining lifetime of `key`, or `None` if absent or expired.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        self.keyspace.lock().await.ttl(key)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.keyspace.lock().await.get(key).is_some()
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    fn retire(&self, ks: &mut Keyspace, user_id: &UserId, fp: &Fingerprint, ttl: Duration) {
        ks.del(&self.keys.refresh_token(fp));
        ks.set(self.keys.retired_refresh_token(fp), user_id.as_str(), ttl);
    }
}

impl Default for MemorySessionRepo {
    fn default() -> Self {
        MemorySessionRepo::new(SessionKeys::default())
    }
}

#[async_trait::async_trait]
impl SessionRepo for MemorySessionRepo {
    async fn replace_session(
        &self,
        user_id: &UserId,
        new_rt: &Fingerprint,
        superseded: Option<&Fingerprint>,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let mut ks = self.keyspace.lock().await;

        let current = ks.get(&session_key).map(Fingerprint::from_stored);
        if let Some(current) = current.as_ref().filter(|fp| *fp != new_rt) {
            self.retire(&mut ks, user_id, current, ttl);
        }
        if let Some(superseded) = superseded.filter(|fp| Some(*fp) != current.as_ref()) {
            self.retire(&mut ks, user_id, superseded, ttl);
        }

        ks.set(self.keys.refresh_token(new_rt), user_id.as_str(), ttl);
        ks.set(session_key, new_rt.as_str(), ttl);
        Ok(())
    }

    async fn check_refresh(&self, rt: &Fingerprint) -> Result<RefreshCheck, AuthError> {
        let mut ks = self.keyspace.lock().await;

        let live = ks.get(&self.keys.refresh_token(rt));
        let is_live = live.is_some();
        let owner = match live.or_else(|| ks.get(&self.keys.retired_refresh_token(rt))) {
            Some(owner) => UserId(owner),
            None => return Ok(RefreshCheck::NotFound),
        };

        let session_key = self.keys.user_session(&owner);
        if is_live && ks.get(&session_key).as_deref() == Some(rt.as_str()) {
            return Ok(RefreshCheck::Active(owner));
        }

        ks.del(&session_key);
        Ok(RefreshCheck::Mismatch(owner))
    }

    async fn discard_session(
        &self,
        user_id: &UserId,
        rt: &Fingerprint,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let mut ks = self.keyspace.lock().await;

        ks.del(&self.keys.refresh_token(rt));
        if ks.get(&session_key).as_deref() == Some(rt.as_str()) {
            ks.del(&session_key);
        }
        Ok(())
    }

    async fn delete_session(
        &self,
        user_id: &UserId,
        rt: Option<&Fingerprint>,
    ) -> Result<(), AuthError> {
        let session_key = self.keys.user_session(user_id);
        let mut ks = self.keyspace.lock().await;

        let current = ks.get(&session_key).map(Fingerprint::from_stored);
        if let Some(current) = current.as_ref() {
            ks.del(&self.keys.refresh_token(current));
        }
        if let Some(supplied) = rt.filter(|fp| Some(*fp) != current.as_ref()) {
            let record_key = self.keys.refresh_token(supplied);
            if ks.get(&record_key).as_deref() == Some(user_id.as_str()) {
                ks.del(&record_key);
            }
        }
        ks.del(&session_key);
        Ok(())
    }

    async fn blacklist_access(&self, at: &Fingerprint, ttl: Duration) -> Result<(), AuthError> {
        let mut ks = self.keyspace.lock().await;
        ks.set(self.keys.blacklist(at), "1", ttl);
        Ok(())
    }

    async fn is_blacklisted(&self, at: &Fingerprint) -> Result<bool, AuthError> {
        let mut ks = self.keyspace.lock().await;
        Ok(ks.get(&self.keys.blacklist(at)).is_some())
    }
}
