use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use ferrex_model::{unix_now, User};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Creates the single admin user with an argon2-hashed password.
    /// There is exactly one user row in this catalog (§3); calling this
    /// when a user already exists is an `AlreadyExists` error.
    pub async fn create_user(&self, password: &str) -> Result<User> {
        use sqlx::Row;
        let existing: Option<i64> = self
            .timed("users.create_lookup", || {
                sqlx::query("SELECT id FROM users LIMIT 1").fetch_optional(&self.pool)
            })
            .await?
            .map(|row| row.try_get("id"))
            .transpose()?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists("user already exists".to_string()));
        }

        let hash = hash_password(password)?;
        let now = unix_now();
        let result = self
            .timed("users.create_insert", || {
                sqlx::query(
                    "INSERT INTO users (password_hash, created_at, updated_at) VALUES (?, ?, ?)",
                )
                .bind(&hash)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
            })
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            password_hash: hash,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validates `password` against the stored hash for `user_id`,
    /// returning the user on success.
    pub async fn validate_password(&self, user_id: i64, password: &str) -> Result<User> {
        use sqlx::Row;
        let row = self
            .timed("users.validate_password_lookup", || {
                sqlx::query(
                    "SELECT id, password_hash, created_at, updated_at FROM users WHERE id = ?",
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
            })
            .await?
            .ok_or_else(|| StorageError::NotFound("user not found".to_string()))?;

        let password_hash: String = row.try_get("password_hash")?;
        verify_password(password, &password_hash)?;

        Ok(User {
            id: row.try_get("id")?,
            password_hash,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Updates the stored password hash for `user_id` and deletes every
    /// existing session for that user, forcing re-authentication
    /// everywhere (§3 cascade).
    pub async fn update_password(&self, user_id: i64, new_password: &str) -> Result<()> {
        let hash = hash_password(new_password)?;
        let now = unix_now();
        self.timed("users.update_password", || async {
            let mut tx = self.pool.begin().await?;
            let result = sqlx::query(
                "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&hash)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StorageError::NotFound("user not found".to_string()));
            }
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        use sqlx::Row;
        let row = self
            .timed("users.get", || {
                sqlx::query(
                    "SELECT id, password_hash, created_at, updated_at FROM users WHERE id = ?",
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
            })
            .await?
            .ok_or_else(|| StorageError::NotFound("user not found".to_string()))?;
        Ok(User {
            id: row.try_get("id")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StorageError::Storage(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| StorageError::Storage(format!("stored password hash is corrupt: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| StorageError::Validation("incorrect password".to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_contracts::NullObserver;

    use super::*;

    async fn store() -> CatalogStore {
        CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_user_then_validate_password_round_trips() {
        let store = store().await;
        let user = store.create_user("correct horse battery staple").await.unwrap();
        store
            .validate_password(user.id, "correct horse battery staple")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validate_password_rejects_wrong_password() {
        let store = store().await;
        let user = store.create_user("right-password").await.unwrap();
        let err = store.validate_password(user.id, "wrong-password").await;
        assert!(matches!(err, Err(StorageError::Validation(_))));
    }

    #[tokio::test]
    async fn create_user_twice_is_already_exists() {
        let store = store().await;
        store.create_user("first").await.unwrap();
        let err = store.create_user("second").await;
        assert!(matches!(err, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn update_password_invalidates_existing_sessions() {
        let store = store().await;
        let user = store.create_user("old-password").await.unwrap();
        let issued = store.create_session(user.id).await.unwrap();

        store.update_password(user.id, "new-password").await.unwrap();

        let token_hash = crate::sessions::hash_token(&issued.token);
        let validated = store.validate_session(&token_hash).await;
        assert!(validated.is_err());
        store
            .validate_password(user.id, "new-password")
            .await
            .unwrap();
    }
}
