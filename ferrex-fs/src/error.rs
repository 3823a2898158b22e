use thiserror::Error;

/// Classified filesystem failure. Classification happens in exactly one
/// place ([`classify`](crate::retry::classify)) so the retryable set
/// stays auditable (§9: "NFS resilience is a C1 concern exclusively").
#[derive(Error, Debug)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A previously valid NFS handle was invalidated by remote state
    /// change (ESTALE). The only retryable class.
    #[error("stale handle: {0}")]
    Stale(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(format!("{}: {err}", path.display())),
            ErrorKind::PermissionDenied => {
                FsError::PermissionDenied(format!("{}: {err}", path.display()))
            }
            _ => {
                if is_stale_handle(&err) {
                    FsError::Stale(format!("{}: {err}", path.display()))
                } else {
                    FsError::Io(format!("{}: {err}", path.display()))
                }
            }
        }
    }
}

/// Recognizes ESTALE both as the direct OS error and anywhere in the
/// error's source chain (some async runtimes wrap it).
fn is_stale_handle(err: &std::io::Error) -> bool {
    const ESTALE: i32 = 116; // Linux errno for ESTALE; matched by raw_os_error across our target platforms.

    let mut cursor: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = cursor {
        if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
            if io_err.raw_os_error() == Some(ESTALE) {
                return true;
            }
        }
        cursor = e.source();
    }
    err.raw_os_error() == Some(ESTALE)
}
