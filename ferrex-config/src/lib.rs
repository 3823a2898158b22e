//! Typed configuration for the Ferrex catalog core: the enumerated
//! option set from spec §6, a TOML + defaults loader, and range
//! validation.

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_from_file, load_from_str, ConfigLoadError};
pub use models::{Acceleration, Config, ThumbnailEncoding, VolumeMapEntry};
pub use validation::{validate, ConfigError};
