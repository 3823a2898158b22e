use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailState {
    Missing,
    Generated,
    Failed,
}

impl ThumbnailState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailState::Missing => "missing",
            ThumbnailState::Generated => "generated",
            ThumbnailState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ThumbnailState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing" => Ok(ThumbnailState::Missing),
            "generated" => Ok(ThumbnailState::Generated),
            "failed" => Ok(ThumbnailState::Failed),
            other => Err(format!("unknown thumbnail state: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailStatus {
    pub path: String,
    pub state: ThumbnailState,
    pub attempted_at: Option<i64>,
    pub artifact_path: Option<String>,
}
