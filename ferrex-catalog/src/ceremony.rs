use ferrex_contracts::Clock;
use ferrex_model::{CeremonyChallenge, CEREMONY_TTL_SECONDS};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Stashes WebAuthn ceremony state under `session_id`, expiring
    /// `CEREMONY_TTL_SECONDS` from `clock.now()`. A second call with the
    /// same `session_id` overwrites the first (one challenge in flight
    /// per session).
    pub async fn put_challenge(
        &self,
        session_id: &str,
        session_data: &[u8],
        clock: &dyn Clock,
    ) -> Result<()> {
        let expires_at = clock.now().timestamp() + CEREMONY_TTL_SECONDS;
        self.timed("ceremony.put_challenge", || {
            sqlx::query(
                "INSERT INTO ceremony_challenges (session_id, session_data, expires_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(session_id) DO UPDATE SET
                    session_data = excluded.session_data,
                    expires_at = excluded.expires_at",
            )
            .bind(session_id)
            .bind(session_data)
            .bind(expires_at)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Reads and deletes the ceremony challenge for `session_id` in one
    /// transaction (consume-on-read, §3). Expired challenges are
    /// treated as absent.
    pub async fn take_challenge(
        &self,
        session_id: &str,
        clock: &dyn Clock,
    ) -> Result<CeremonyChallenge> {
        use sqlx::Row;
        let row = self
            .timed("ceremony.take_challenge", || async {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query(
                    "SELECT session_id, session_data, expires_at
                     FROM ceremony_challenges WHERE session_id = ?",
                )
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    StorageError::NotFound("ceremony challenge not found".to_string())
                })?;

                sqlx::query("DELETE FROM ceremony_challenges WHERE session_id = ?")
                    .bind(session_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok(row)
            })
            .await?;

        let expires_at: i64 = row.try_get("expires_at")?;
        if clock.now().timestamp() >= expires_at {
            return Err(StorageError::NotFound("ceremony challenge expired".to_string()));
        }

        Ok(CeremonyChallenge {
            session_id: row.try_get("session_id")?,
            session_data: row.try_get("session_data")?,
            expires_at,
        })
    }

    /// Deletes every ceremony challenge expired at or before `clock.now()`.
    pub async fn sweep_expired_challenges(&self, clock: &dyn Clock) -> Result<u64> {
        let now = clock.now().timestamp();
        let result = self
            .timed("ceremony.sweep_expired", || {
                sqlx::query("DELETE FROM ceremony_challenges WHERE expires_at <= ?")
                    .bind(now)
                    .execute(&self.pool)
            })
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use ferrex_contracts::{FixedClock, NullObserver};

    use super::*;

    async fn store() -> CatalogStore {
        CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_then_take_challenge_round_trips_and_consumes() {
        let store = store().await;
        let clock = FixedClock::new(Utc::now());
        store
            .put_challenge("sess-1", b"challenge-bytes", &clock)
            .await
            .unwrap();

        let challenge = store.take_challenge("sess-1", &clock).await.unwrap();
        assert_eq!(challenge.session_data, b"challenge-bytes");

        let err = store.take_challenge("sess-1", &clock).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn second_put_overwrites_first() {
        let store = store().await;
        let clock = FixedClock::new(Utc::now());
        store.put_challenge("sess-1", b"first", &clock).await.unwrap();
        store.put_challenge("sess-1", b"second", &clock).await.unwrap();

        let challenge = store.take_challenge("sess-1", &clock).await.unwrap();
        assert_eq!(challenge.session_data, b"second");
    }

    #[tokio::test]
    async fn expired_challenge_is_rejected_on_take() {
        let store = store().await;
        let clock = FixedClock::new(Utc::now());
        store.put_challenge("sess-1", b"bytes", &clock).await.unwrap();
        clock.advance(chrono::Duration::seconds(ferrex_model::CEREMONY_TTL_SECONDS + 1));

        let err = store.take_challenge("sess-1", &clock).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn sweep_expired_challenges_removes_only_past_expiry() {
        let store = store().await;
        let clock = FixedClock::new(Utc::now());
        store.put_challenge("sess-1", b"bytes", &clock).await.unwrap();
        clock.advance(chrono::Duration::seconds(ferrex_model::CEREMONY_TTL_SECONDS + 1));

        let count = store.sweep_expired_challenges(&clock).await.unwrap();
        assert_eq!(count, 1);
    }
}
