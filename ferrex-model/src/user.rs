use serde::{Deserialize, Serialize};

/// Single-user model (§3): exactly one row exists for the lifetime of a
/// deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}
