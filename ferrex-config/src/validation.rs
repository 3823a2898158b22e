use crate::models::Config;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be >= 1, got {value}")]
    TooLow { field: &'static str, value: i64 },

    #[error("{field} must be in (0.0, 1.0), got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    #[error("memory_high_ratio ({high}) must be < memory_critical_ratio ({critical})")]
    PressureThresholdsOutOfOrder { high: f64, critical: f64 },

    #[error("index_workers recommended range is 1..=16, got {0}")]
    WorkerCountOutOfRange(usize),
}

/// Validates the recognized-option set per §6/§4.3 ("recommended range
/// 1-16"). Returns all violations rather than stopping at the first, so
/// an operator fixing a config file sees every problem in one pass.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.index_workers == 0 {
        errors.push(ConfigError::TooLow {
            field: "index_workers",
            value: 0,
        });
    } else if config.index_workers > 16 {
        errors.push(ConfigError::WorkerCountOutOfRange(config.index_workers));
    }

    if config.thumb_workers == 0 {
        errors.push(ConfigError::TooLow {
            field: "thumb_workers",
            value: 0,
        });
    }

    if config.transcode_global_concurrency == 0 {
        errors.push(ConfigError::TooLow {
            field: "transcode_global_concurrency",
            value: 0,
        });
    }

    for (field, value) in [
        ("memory_high_ratio", config.memory_high_ratio),
        ("memory_critical_ratio", config.memory_critical_ratio),
        ("session_extend_threshold", config.session_extend_threshold),
    ] {
        if !(0.0..1.0).contains(&value) {
            errors.push(ConfigError::RatioOutOfRange { field, value });
        }
    }

    if config.memory_high_ratio >= config.memory_critical_ratio {
        errors.push(ConfigError::PressureThresholdsOutOfOrder {
            high: config.memory_high_ratio,
            critical: config.memory_critical_ratio,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
