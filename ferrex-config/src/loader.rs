use crate::models::Config;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads a [`Config`] from a TOML file, falling back to defaults for any
/// field absent from the file (§6, `Config` is "an enumerated set of
/// recognized options").
pub fn load_from_file(path: &Path) -> Result<Config, ConfigLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = load_from_str(&text)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

pub fn load_from_str(text: &str) -> Result<Config, ConfigLoadError> {
    let config: Config = toml::from_str(text)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = load_from_str(
            r#"
            media_root = "/data/media"
            cache_dir = "/data/cache"
            database_dir = "/data/db"
            "#,
        )
        .unwrap();

        assert_eq!(config.media_root.to_str().unwrap(), "/data/media");
        assert_eq!(config.index_workers, 3);
        assert_eq!(config.session_extend_threshold, 0.10);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(load_from_str("not = [valid").is_err());
    }
}
