use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ferrex_contracts::{Clock, RandomSource};
use ferrex_model::{IssuedSession, Session};
use sha2::{Digest, Sha256};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

const TOKEN_BYTES: usize = 32;

/// SHA-256 hex digest of a bearer token. Only the digest is persisted;
/// callers hash the plaintext token themselves when validating.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl CatalogStore {
    /// Issues a new session for `user_id`, valid for `window_secs` from
    /// `clock.now()`. Only the SHA-256 hash of the bearer token is
    /// persisted (§7); the plaintext token is returned once and never
    /// stored.
    pub async fn create_session(&self, user_id: i64) -> Result<IssuedSession> {
        self.create_session_with(user_id, &ferrex_contracts::SystemClock, self.session_window_secs)
            .await
    }

    pub async fn create_session_with(
        &self,
        user_id: i64,
        clock: &dyn Clock,
        window_secs: i64,
    ) -> Result<IssuedSession> {
        let random = ferrex_contracts::OsRandom;
        let token_bytes = random.token_bytes(TOKEN_BYTES);
        let token = URL_SAFE_NO_PAD.encode(token_bytes);
        let token_hash = hash_token(&token);

        let now = clock.now().timestamp();
        let expires_at = now + window_secs;

        self.timed("sessions.create", || {
            sqlx::query(
                "INSERT INTO sessions (user_id, token_hash, expires_at, last_activity)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(&token_hash)
            .bind(expires_at)
            .bind(now)
            .execute(&self.pool)
        })
        .await?;

        self.observer.session_created();
        Ok(IssuedSession { token, expires_at })
    }

    /// Validates a bearer token's hash, returning the session if it has
    /// not expired. Sliding expiration: when more than `extend_threshold`
    /// of the window has elapsed since `last_activity`, the session is
    /// extended back out to a full window from now (§4.7 decision).
    pub async fn validate_session(&self, token_hash: &str) -> Result<Session> {
        self.validate_session_with(
            token_hash,
            &ferrex_contracts::SystemClock,
            self.session_window_secs,
            self.session_extend_threshold,
        )
        .await
    }

    pub async fn validate_session_with(
        &self,
        token_hash: &str,
        clock: &dyn Clock,
        window_secs: i64,
        extend_threshold: f64,
    ) -> Result<Session> {
        use sqlx::Row;
        let row = self
            .timed("sessions.validate_lookup", || {
                sqlx::query(
                    "SELECT id, user_id, token_hash, expires_at, last_activity
                     FROM sessions WHERE token_hash = ?",
                )
                .bind(token_hash)
                .fetch_optional(&self.pool)
            })
            .await?
            .ok_or_else(|| StorageError::NotFound("session not found".to_string()))?;

        let id: i64 = row.try_get("id")?;
        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: i64 = row.try_get("expires_at")?;
        let last_activity: i64 = row.try_get("last_activity")?;

        let now = clock.now().timestamp();
        if now >= expires_at {
            self.timed("sessions.delete_expired_one", || {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
            })
            .await?;
            return Err(StorageError::NotFound("session expired".to_string()));
        }

        let elapsed = now - last_activity;
        let mut new_expires_at = expires_at;
        if (elapsed as f64) > (window_secs as f64) * extend_threshold {
            new_expires_at = now + window_secs;
        }

        self.timed("sessions.validate_update", || {
            sqlx::query("UPDATE sessions SET expires_at = ?, last_activity = ? WHERE id = ?")
                .bind(new_expires_at)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
        })
        .await?;

        Ok(Session {
            id,
            user_id,
            token_hash: token_hash.to_string(),
            expires_at: new_expires_at,
            last_activity: now,
        })
    }

    /// Deletes every session with `expires_at` at or before `clock.now()`.
    pub async fn delete_expired_sessions(&self, clock: &dyn Clock) -> Result<u64> {
        let now = clock.now().timestamp();
        let result = self
            .timed("sessions.delete_expired", || {
                sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
                    .bind(now)
                    .execute(&self.pool)
            })
            .await?;
        let count = result.rows_affected();
        if count > 0 {
            self.observer.session_expired_swept(count as usize);
        }
        Ok(count)
    }
}
