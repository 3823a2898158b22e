//! The durable catalog (§3): a single SQLite database, one writer
//! discipline, full-text search over names and paths, and the
//! authentication state (users, sessions, passkey credentials) the
//! server needs to gate access.

mod ceremony;
mod cleanup;
mod credentials;
mod error;
mod favorites;
mod files;
mod metadata_kv;
mod search;
mod sessions;
mod store;
mod tags;
mod thumbnail_status;
mod users;

pub use cleanup::CleanupTask;
pub use error::{Result, StorageError};
pub use sessions::hash_token;
pub use store::CatalogStore;
