use regex::Regex;
use std::sync::OnceLock;

fn media_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<media[^>]*\bsrc\s*=\s*"([^"]+)""#).unwrap())
}

/// Extracts every `<media src="...">` reference from raw WPL document
/// text, in order. A genuinely malformed document simply yields no
/// references; the indexer does not fail a walk over unparsable playlists.
pub fn extract_wpl_sources(document: &str) -> Vec<String> {
    media_tag_regex()
        .captures_iter(document)
        .map(|c| c[1].to_string())
        .collect()
}

fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn strip_unc_prefix(raw: &str) -> &str {
    raw.trim_start_matches("//").trim_start_matches('/')
}

/// Resolves one raw WPL media reference to a canonical catalog-relative
/// path, or `None` if it cannot be matched to anything under the media
/// root (§9 decision). Pure function of its inputs; `known_paths` is the
/// already-indexed catalog path set used for the longest-suffix match.
///
/// Strategies, tried in order:
/// 1. Join `raw_src` directly against `playlist_dir`.
/// 2. Join `raw_src` directly against `media_root` (i.e. treat it as
///    already root-relative).
/// 3. Longest-suffix match: walk `raw_src`'s path components from the
///    end and find the longest run that matches the tail of some entry
///    in `known_paths`, bounded to `max_suffix_depth` components.
pub fn resolve_playlist_source(
    playlist_dir: &str,
    raw_src: &str,
    known_paths: &[String],
    max_suffix_depth: usize,
) -> Option<String> {
    let normalized = normalize_slashes(raw_src);
    let normalized = strip_unc_prefix(&normalized);

    let direct_in_playlist_dir = join_relative(playlist_dir, normalized);
    if known_paths.iter().any(|p| p == &direct_in_playlist_dir) {
        return Some(direct_in_playlist_dir);
    }

    if known_paths.iter().any(|p| p == normalized) {
        return Some(normalized.to_string());
    }

    let components: Vec<&str> = normalized.split('/').filter(|c| !c.is_empty()).collect();
    for depth in (1..=components.len().min(max_suffix_depth)).rev() {
        let suffix = components[components.len() - depth..].join("/");
        if let Some(matched) = known_paths.iter().find(|p| p.ends_with(&suffix)) {
            return Some(matched.clone());
        }
    }

    None
}

fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_media_sources_in_document_order() {
        let doc = r#"
            <smil><body><seq>
                <media src="song1.mp3"/>
                <media src="Sub Folder\song2.mp3" />
            </seq></body></smil>
        "#;
        let sources = extract_wpl_sources(doc);
        assert_eq!(sources, vec!["song1.mp3", "Sub Folder\\song2.mp3"]);
    }

    #[test]
    fn resolves_via_playlist_dir_join_first() {
        let known = vec!["music/playlists/song1.mp3".to_string()];
        let resolved = resolve_playlist_source("music/playlists", "song1.mp3", &known, 4);
        assert_eq!(resolved.as_deref(), Some("music/playlists/song1.mp3"));
    }

    #[test]
    fn resolves_via_media_root_join_when_playlist_dir_join_misses() {
        let known = vec!["music/song1.mp3".to_string()];
        let resolved = resolve_playlist_source("music/playlists", "music/song1.mp3", &known, 4);
        assert_eq!(resolved.as_deref(), Some("music/song1.mp3"));
    }

    #[test]
    fn resolves_via_longest_suffix_match_when_direct_joins_miss() {
        let known = vec!["music/artist/album/song1.mp3".to_string()];
        let resolved = resolve_playlist_source(
            "playlists",
            r"C:\Users\someone\Music\artist\album\song1.mp3",
            &known,
            4,
        );
        assert_eq!(resolved.as_deref(), Some("music/artist/album/song1.mp3"));
    }

    #[test]
    fn returns_none_when_nothing_matches() {
        let known = vec!["music/other.mp3".to_string()];
        let resolved = resolve_playlist_source("playlists", "missing.mp3", &known, 4);
        assert_eq!(resolved, None);
    }
}
