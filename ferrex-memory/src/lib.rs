//! Memory pressure monitor (C6): a three-level signal {normal, high,
//! critical} computed from process memory against a configured
//! ceiling, sampled on a tick. No blocking API: consumers read the
//! latest level through a `watch` handle.

pub mod monitor;

pub use monitor::{MemoryHandle, MemoryMonitor};
