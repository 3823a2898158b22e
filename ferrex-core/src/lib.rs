//! Process orchestration (C9): wires the filesystem layer, catalog,
//! indexer, thumbnail and transcode engines, and memory monitor into
//! one lifecycle with a spec'd startup and shutdown order (§4.9).

pub mod core;
pub mod error;

pub use core::Core;
pub use error::{BuildError, Result};
