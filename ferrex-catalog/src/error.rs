use thiserror::Error;

/// Storage-layer failure kinds (§7). Constraint violations are reported
/// distinctly from generic storage failures so callers can map
/// `AlreadyExists` to an idempotent success where that behavior is required.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage engine error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if is_unique_violation(db_err.as_ref()) => {
                StorageError::AlreadyExists(db_err.to_string())
            }
            _ => StorageError::Storage(err.to_string()),
        }
    }
}

fn is_unique_violation(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err.is_unique_violation()
}

impl From<StorageError> for ferrex_contracts::CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(m) => ferrex_contracts::CoreError::NotFound(m),
            StorageError::AlreadyExists(m) => ferrex_contracts::CoreError::AlreadyExists(m),
            StorageError::Validation(m) => ferrex_contracts::CoreError::Validation(m),
            StorageError::Storage(m) => ferrex_contracts::CoreError::Storage(m),
        }
    }
}
