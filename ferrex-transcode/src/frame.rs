use std::path::Path;

use tokio::process::Command;

use crate::error::{Result, TranscodeError};

/// Extracts a single representative frame from a video as encoded JPEG
/// bytes, via `ffmpeg -ss <t> -i <path> -vframes 1 -f image2 pipe:1`
/// (§4.4 step 2: "for videos, extract a single representative frame via
/// an external process"). `timestamp_secs` is clamped to `[0, duration)`
/// by the caller; this function does not probe duration itself.
pub async fn extract_frame(ffmpeg_path: &str, path: &Path, timestamp_secs: f64) -> Result<Vec<u8>> {
    let path_str = path
        .to_str()
        .ok_or_else(|| TranscodeError::ProbeFailed("non-utf8 path".to_string()))?;

    let output = Command::new(ffmpeg_path)
        .args([
            "-y",
            "-ss",
            &format!("{timestamp_secs:.3}"),
            "-i",
            path_str,
            "-vframes",
            "1",
            "-f",
            "image2",
            "-c:v",
            "mjpeg",
            "pipe:1",
        ])
        .output()
        .await
        .map_err(|e| TranscodeError::ProbeFailed(e.to_string()))?;

    if !output.status.success() || output.stdout.is_empty() {
        let tail = String::from_utf8_lossy(&output.stderr)
            .lines()
            .rev()
            .take(20)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(TranscodeError::TranscodeFailed(tail));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_surfaces_probe_failed() {
        let err = extract_frame("definitely-not-a-real-binary", Path::new("x.mp4"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeFailed(_)));
    }
}
