use thiserror::Error;

/// Failures that can abort startup before the process is serving
/// anything. Once [`crate::Core::start`] returns `Ok`, failures inside
/// individual components surface through their own observer calls
/// instead of here.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid configuration: {0:?}")]
    InvalidConfig(Vec<ferrex_config::ConfigError>),

    #[error("failed to open catalog: {0}")]
    Catalog(#[from] ferrex_catalog::StorageError),
}

pub type Result<T> = std::result::Result<T, BuildError>;
