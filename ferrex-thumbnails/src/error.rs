use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("storage error: {0}")]
    Storage(#[from] ferrex_catalog::StorageError),
}

pub type Result<T> = std::result::Result<T, ThumbnailError>;

impl From<ThumbnailError> for ferrex_contracts::CoreError {
    fn from(err: ThumbnailError) -> Self {
        match err {
            ThumbnailError::NotFound(m) => ferrex_contracts::CoreError::NotFound(m),
            ThumbnailError::Decode(m) => ferrex_contracts::CoreError::ProbeFailed(m),
            ThumbnailError::Encode(m) => ferrex_contracts::CoreError::EncodeFailed(m),
            ThumbnailError::Cache(m) => ferrex_contracts::CoreError::Storage(m),
            ThumbnailError::Storage(e) => e.into(),
        }
    }
}
