use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("write stalled past the configured timeout")]
    WriteTimeout,

    #[error("cancelled")]
    Cancelled,

    #[error("cache error: {0}")]
    Cache(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TranscodeError>;

impl From<TranscodeError> for ferrex_contracts::CoreError {
    fn from(err: TranscodeError) -> Self {
        use ferrex_contracts::CoreError;
        match err {
            TranscodeError::NotFound(m) => CoreError::NotFound(m),
            TranscodeError::ProbeFailed(m) => CoreError::ProbeFailed(m),
            TranscodeError::TranscodeFailed(m) => CoreError::EncodeFailed(m),
            TranscodeError::WriteTimeout => CoreError::Timeout,
            TranscodeError::Cancelled => CoreError::Cancelled,
            TranscodeError::Cache(m) => CoreError::Storage(m),
            TranscodeError::Io(m) => CoreError::Storage(m),
        }
    }
}
