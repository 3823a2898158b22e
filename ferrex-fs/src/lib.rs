//! Resilient filesystem layer (C1): `Stat`/`Open`/`ReadDir`/`WriteFile`
//! wrappers that classify errors, retry NFS stale-handle failures with
//! bounded exponential backoff, and tag every call with a volume label.

pub mod error;
pub mod filesystem;
pub mod retry;
pub mod volume;

pub use error::{FsError, Result};
pub use filesystem::{DirEntry, FileStat, FileSystem, InMemoryFs, ResilientFs};
pub use retry::RetryConfig;
pub use volume::VolumeResolver;
