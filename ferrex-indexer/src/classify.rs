use ferrex_model::MediaKind;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "heic"];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
];
const PLAYLIST_EXTENSIONS: &[&str] = &["wpl", "m3u", "m3u8"];

/// Classifies a file by its extension, case-insensitively. Returns
/// `None` for anything not recognized, so the walker can skip it (§4.3).
pub fn classify(name: &str) -> Option<MediaKind> {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else if PLAYLIST_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Playlist)
    } else {
        None
    }
}

pub fn is_wpl(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("wpl"))
        .unwrap_or(false)
}
