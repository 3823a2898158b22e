use serde::{Deserialize, Serialize};

/// A sliding session (§3, §4.2). The opaque token itself is never
/// persisted; only `token_hash = SHA-256(token)` is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: i64,
    pub last_activity: i64,
}

/// Returned to the caller on `CreateSession`; the opaque token is
/// surfaced exactly once and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: i64,
}
