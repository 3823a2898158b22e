//! On-demand video transcoder (C5): probe sources, serve a passthrough
//! or hardware-accelerated transcoded stream, and cache results with
//! LRU eviction.

pub mod cache;
pub mod engine;
pub mod error;
pub mod frame;
pub mod hardware;
pub mod probe;

pub use cache::TranscodeCache;
pub use engine::{Engine, EngineConfig};
pub use error::{Result, TranscodeError};
pub use frame::extract_frame;
pub use hardware::detect_acceleration;
pub use probe::{probe, satisfies_target, ProbeInfo};
