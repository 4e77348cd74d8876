use super::{Fingerprint, UserId};

pub const DEFAULT_KEY_NAMESPACE: &str = "auth";

/// Builds the store keys of the session key families.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    namespace: String,
}

impl SessionKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        SessionKeys {
            namespace: namespace.into(),
        }
    }

    /// Single-slot pointer to the user's current refresh-token fingerprint.
    pub fn user_session(&self, user_id: &UserId) -> String {
        format!("{}{}", self.user_session_prefix(), user_id)
    }

    pub fn refresh_token(&self, fingerprint: &Fingerprint) -> String {
        format!("{}{}", self.refresh_token_prefix(), fingerprint)
    }

    /// Left behind when a refresh token is rotated away, so that replaying it
    /// is recognised as reuse rather than as an unknown token.
    pub fn retired_refresh_token(&self, fingerprint: &Fingerprint) -> String {
        format!("{}{}", self.retired_refresh_token_prefix(), fingerprint)
    }

    pub fn blacklist(&self, fingerprint: &Fingerprint) -> String {
        format!("{}:jwt:blacklist:{}", self.namespace, fingerprint)
    }
}

impl SessionKeys {
    // Prefixes are handed to store scripts that derive keys from stored values.

    pub fn user_session_prefix(&self) -> String {
        format!("{}:user_session:", self.namespace)
    }

    pub fn refresh_token_prefix(&self) -> String {
        format!("{}:rt:", self.namespace)
    }

    pub fn retired_refresh_token_prefix(&self) -> String {
        format!("{}:rt_retired:", self.namespace)
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        SessionKeys::new(DEFAULT_KEY_NAMESPACE)
    }
}
