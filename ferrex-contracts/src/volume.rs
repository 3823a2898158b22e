/// A short label for a configured mount, attached to every filesystem
/// operation for observability (§4.1).
pub type VolumeLabel = &'static str;

pub const UNKNOWN_VOLUME: VolumeLabel = "unknown";
