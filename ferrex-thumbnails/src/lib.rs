//! Thumbnail generation worker pool (C4): decode, downscale, encode,
//! cache by content address under `cache_dir/thumbnails`.

pub mod cache;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use cache::ThumbnailCache;
pub use engine::{EngineConfig, EnsureOutcome, Engine};
pub use error::{Result, ThumbnailError};
pub use pipeline::process_image;
