use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagWithCount {
    pub name: String,
    pub count: u64,
}

/// Normalizes a raw tag name for storage/lookup: trims, lowercases, and
/// collapses internal whitespace, matching the uniqueness constraint on
/// `Tag.name` (§3).
pub fn normalize_tag_name(raw: &str) -> String {
    raw.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::normalize_tag_name;

    #[test]
    fn normalizes_whitespace_and_case() {
        assert_eq!(normalize_tag_name("  Red  Car "), "red car");
        assert_eq!(normalize_tag_name("RED"), "red");
    }
}
