use thiserror::Error;

/// Error taxonomy shared by every core crate.
///
/// Variants are kinds, not leaf types: crates that own a more specific
/// failure (e.g. `ferrex_fs::FsError`) wrap it with `#[from]` rather than
/// re-deriving the same set of strings here.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("operation rejected under memory pressure")]
    Memory,

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,

    #[error("external probe failed: {0}")]
    ProbeFailed(String),

    #[error("external encode failed: {0}")]
    EncodeFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// True when the caller retried successfully would likely produce a
    /// different outcome (used by handlers deciding whether to surface
    /// idempotent success, per spec §7).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, CoreError::AlreadyExists(_))
    }
}
