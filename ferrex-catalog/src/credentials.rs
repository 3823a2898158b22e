use ferrex_model::{unix_now, Credential};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Stores a newly registered WebAuthn credential (opaque public key
    /// blob; ceremony cryptography itself is out of scope here, §1).
    #[allow(clippy::too_many_arguments)]
    pub async fn add_credential(
        &self,
        credential_id: &str,
        user_id: i64,
        public_key: &[u8],
        attestation_type: &str,
        aaguid: &str,
        name: &str,
        transports: &[String],
    ) -> Result<Credential> {
        let now = unix_now();
        let transports_joined = transports.join(",");
        self.timed("credentials.add", || {
            sqlx::query(
                "INSERT INTO credentials
                    (credential_id, user_id, public_key, attestation_type, aaguid,
                     sign_count, name, transports, created_at, last_used_at)
                 VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, NULL)",
            )
            .bind(credential_id)
            .bind(user_id)
            .bind(public_key)
            .bind(attestation_type)
            .bind(aaguid)
            .bind(name)
            .bind(&transports_joined)
            .bind(now)
            .execute(&self.pool)
        })
        .await?;

        Ok(Credential {
            credential_id: credential_id.to_string(),
            public_key: public_key.to_vec(),
            attestation_type: attestation_type.to_string(),
            aaguid: aaguid.to_string(),
            sign_count: 0,
            name: name.to_string(),
            transports: transports.to_vec(),
            created_at: now,
            last_used_at: None,
        })
    }

    pub async fn get_credential(&self, credential_id: &str) -> Result<Credential> {
        use sqlx::Row;
        let row = self
            .timed("credentials.get", || {
                sqlx::query(
                    "SELECT credential_id, public_key, attestation_type, aaguid, sign_count,
                            name, transports, created_at, last_used_at
                     FROM credentials WHERE credential_id = ?",
                )
                .bind(credential_id)
                .fetch_optional(&self.pool)
            })
            .await?
            .ok_or_else(|| StorageError::NotFound("credential not found".to_string()))?;
        row_to_credential(row)
    }

    pub async fn list_credentials_for_user(&self, user_id: i64) -> Result<Vec<Credential>> {
        use sqlx::Row;
        let rows = self
            .timed("credentials.list_for_user", || {
                sqlx::query(
                    "SELECT credential_id, public_key, attestation_type, aaguid, sign_count,
                            name, transports, created_at, last_used_at
                     FROM credentials WHERE user_id = ? ORDER BY created_at ASC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter().map(row_to_credential).collect()
    }

    pub async fn rename_credential(&self, credential_id: &str, name: &str) -> Result<()> {
        let result = self
            .timed("credentials.rename", || {
                sqlx::query("UPDATE credentials SET name = ? WHERE credential_id = ?")
                    .bind(name)
                    .bind(credential_id)
                    .execute(&self.pool)
            })
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("credential not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_credential(&self, credential_id: &str) -> Result<()> {
        self.timed("credentials.delete", || {
            sqlx::query("DELETE FROM credentials WHERE credential_id = ?")
                .bind(credential_id)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Updates the authenticator sign counter and last-used timestamp
    /// after a successful assertion.
    pub async fn update_sign_count(&self, credential_id: &str, sign_count: i64) -> Result<()> {
        let result = self
            .timed("credentials.update_sign_count", || {
                sqlx::query(
                    "UPDATE credentials SET sign_count = ?, last_used_at = ? WHERE credential_id = ?",
                )
                .bind(sign_count)
                .bind(unix_now())
                .bind(credential_id)
                .execute(&self.pool)
            })
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("credential not found".to_string()));
        }
        Ok(())
    }
}

fn row_to_credential(row: sqlx::sqlite::SqliteRow) -> Result<Credential> {
    use sqlx::Row;
    Ok(Credential {
        credential_id: row.try_get("credential_id")?,
        public_key: row.try_get("public_key")?,
        attestation_type: row.try_get("attestation_type")?,
        aaguid: row.try_get("aaguid")?,
        sign_count: row.try_get("sign_count")?,
        name: row.try_get("name")?,
        transports: row
            .try_get::<String, _>("transports")?
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        created_at: row.try_get("created_at")?,
        last_used_at: row.try_get("last_used_at")?,
    })
}
