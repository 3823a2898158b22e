//! Error taxonomy and host-provided interface contracts (`Observer`,
//! `Clock`, `RandomSource`) shared by every crate in the catalog core.
//!
//! Nothing here talks to the filesystem, the catalog, or a subprocess;
//! this crate only defines the seams other crates implement or consume.

pub mod clock;
pub mod error;
pub mod observer;
pub mod random;
pub mod volume;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, Result};
pub use observer::{NullObserver, Observer, TracingObserver};
pub use random::{OsRandom, RandomSource};
pub use volume::{VolumeLabel, UNKNOWN_VOLUME};
