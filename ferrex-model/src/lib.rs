//! Shared data model for the Ferrex catalog core: the entities stored by
//! `ferrex-catalog` (§3) plus the event/query types passed between
//! components (§4).

pub mod credential;
pub mod events;
pub mod favorite;
pub mod file;
pub mod query;
pub mod session;
pub mod tag;
pub mod thumbnail;
pub mod user;

pub use credential::{CeremonyChallenge, Credential, CEREMONY_TTL_SECONDS};
pub use events::{IndexerStatus, MemoryPressureLevel, PressureSource, ReconcileResult, ScannedFile};
pub use favorite::Favorite;
pub use file::{validate_canonical_path, unix_now, FileAttrs, FileEntry, LibraryStats, MediaKind};
pub use query::{ListFilter, ListOptions, Page, SearchHit, Sort, SortField, SortOrder};
pub use session::{IssuedSession, Session};
pub use tag::{normalize_tag_name, Tag, TagWithCount};
pub use thumbnail::{ThumbnailState, ThumbnailStatus};
pub use user::User;
