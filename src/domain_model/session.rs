use super::UserId;

/// Outcome of the atomic refresh-token check against the session pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshCheck {
    /// The token is the one the session currently points to.
    Active(UserId),
    /// No record for this fingerprint: never issued, rotated away and reclaimed, or expired.
    NotFound,
    /// The record exists but the session points elsewhere (or is gone).
    /// The session has already been deleted by the time this is returned.
    Mismatch(UserId),
}
