use std::path::Path;

use tokio::process::Command;

use crate::error::{Result, TranscodeError};

/// Subset of an ffprobe JSON report needed to decide whether a source
/// already satisfies a streaming target (§4.5 `Probe`).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub container: String,
    pub video_codec: String,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Runs `ffprobe -show_streams -show_format` against `path` and extracts
/// the first video stream plus container duration.
pub async fn probe(ffprobe_path: &str, path: &Path) -> Result<ProbeInfo> {
    let path_str = path
        .to_str()
        .ok_or_else(|| TranscodeError::ProbeFailed("non-utf8 path".to_string()))?;

    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path_str,
        ])
        .output()
        .await
        .map_err(|e| TranscodeError::ProbeFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(TranscodeError::ProbeFailed(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    parse_probe_json(&output.stdout)
}

fn parse_probe_json(stdout: &[u8]) -> Result<ProbeInfo> {
    let json: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| TranscodeError::ProbeFailed(e.to_string()))?;

    let video_stream = json["streams"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| TranscodeError::ProbeFailed("no video stream".to_string()))?;

    let video_codec = video_stream["codec_name"]
        .as_str()
        .ok_or_else(|| TranscodeError::ProbeFailed("missing codec_name".to_string()))?
        .to_string();
    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| TranscodeError::ProbeFailed("missing width".to_string()))? as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| TranscodeError::ProbeFailed("missing height".to_string()))? as u32;

    let container = json["format"]["format_name"]
        .as_str()
        .unwrap_or("unknown")
        .split(',')
        .next()
        .unwrap_or("unknown")
        .to_string();

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(ProbeInfo {
        container,
        video_codec,
        width,
        height,
        duration_secs,
    })
}

/// True when a source already satisfies a streaming target and can be
/// served as-is (§4.5 `Stream`: "same codec, width ≤ target").
pub fn satisfies_target(info: &ProbeInfo, target_width: u32, target_codec: &str) -> bool {
    info.video_codec.eq_ignore_ascii_case(target_codec) && info.width <= target_width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> Vec<u8> {
        br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "125.5"}
        }"#
        .to_vec()
    }

    #[test]
    fn parses_video_stream_and_format() {
        let info = parse_probe_json(&sample_json()).unwrap();
        assert_eq!(info.video_codec, "h264");
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.container, "mov");
        assert_eq!(info.duration_secs, 125.5);
    }

    #[test]
    fn missing_video_stream_is_probe_failed() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let err = parse_probe_json(json);
        assert!(matches!(err, Err(TranscodeError::ProbeFailed(_))));
    }

    #[test]
    fn satisfies_target_requires_matching_codec_and_smaller_width() {
        let info = ProbeInfo {
            container: "mov".to_string(),
            video_codec: "h264".to_string(),
            width: 1280,
            height: 720,
            duration_secs: 10.0,
        };
        assert!(satisfies_target(&info, 1920, "h264"));
        assert!(satisfies_target(&info, 1280, "H264"));
        assert!(!satisfies_target(&info, 1920, "hevc"));
        assert!(!satisfies_target(&info, 640, "h264"));
    }
}
