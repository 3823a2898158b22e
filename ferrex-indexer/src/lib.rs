//! Parallel tree walker (C3): brings the catalog into eventual
//! consistency with the media tree on a scheduled cadence, and resolves
//! WPL/M3U playlist references to catalog paths.

pub mod batcher;
pub mod classify;
pub mod indexer;
pub mod playlist;
pub mod scheduler;
pub mod walker;

pub use classify::{classify, is_wpl};
pub use indexer::{Indexer, IndexerConfig};
pub use playlist::{extract_wpl_sources, resolve_playlist_source};
pub use scheduler::{Scheduler, SchedulerConfig};
