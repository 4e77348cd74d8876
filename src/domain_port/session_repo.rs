use crate::application_port::AuthError;
use crate::domain_model::*;
use std::time::Duration;

/// Owns the session, refresh-token and blacklist key families. Every method
/// that decides on shared state does so in one indivisible store step.
#[async_trait::async_trait]
pub trait SessionRepo: Send + Sync {
    /// Point the user's session at `new_rt`, writing its record and dropping
    /// the record the session pointed to before (and `superseded`, if given).
    /// All writes share `ttl`.
    async fn replace_session(
        &self,
        user_id: &UserId,
        new_rt: &Fingerprint,
        superseded: Option<&Fingerprint>,
        ttl: Duration,
    ) -> Result<(), AuthError>;

    /// Look up the record for `rt` and compare it with the session pointer.
    /// On mismatch the session is deleted before returning.
    async fn check_refresh(&self, rt: &Fingerprint) -> Result<RefreshCheck, AuthError>;

    /// Undo a `replace_session` whose tokens were never handed out. Only
    /// removes the session if it still points at `rt`.
    async fn discard_session(&self, user_id: &UserId, rt: &Fingerprint)
    -> Result<(), AuthError>;

    /// Delete the session and its refresh-token record. Uses `rt` when given,
    /// otherwise whatever the session points to. Missing keys are not an error.
    async fn delete_session(
        &self,
        user_id: &UserId,
        rt: Option<&Fingerprint>,
    ) -> Result<(), AuthError>;

    async fn blacklist_access(&self, at: &Fingerprint, ttl: Duration) -> Result<(), AuthError>;

    async fn is_blacklisted(&self, at: &Fingerprint) -> Result<bool, AuthError>;
}
