use std::process::Command as StdCommand;

use ferrex_config::Acceleration;
use tokio::process::Command;

/// Probes for hardware encoders in preference order: NVIDIA, then
/// VA-API, then VideoToolbox, falling back to CPU.
pub async fn detect_acceleration(ffmpeg_path: &str, requested: Acceleration) -> Acceleration {
    if requested != Acceleration::Auto {
        return requested;
    }

    if check_nvidia(ffmpeg_path).await {
        return Acceleration::Nvidia;
    }
    if check_vaapi(ffmpeg_path).await {
        return Acceleration::Vaapi;
    }
    if check_videotoolbox(ffmpeg_path).await {
        return Acceleration::Videotoolbox;
    }
    Acceleration::None
}

async fn check_nvidia(ffmpeg_path: &str) -> bool {
    let nvidia_smi = StdCommand::new("nvidia-smi")
        .arg("--query-gpu=name")
        .arg("--format=csv,noheader")
        .output()
        .ok()
        .filter(|o| o.status.success());
    if nvidia_smi.is_none() {
        return false;
    }
    has_encoder(ffmpeg_path, "h264_nvenc").await
}

async fn check_vaapi(ffmpeg_path: &str) -> bool {
    let vainfo = StdCommand::new("vainfo").output().ok().filter(|o| o.status.success());
    if vainfo.is_none() {
        return false;
    }
    has_encoder(ffmpeg_path, "h264_vaapi").await
}

#[cfg(target_os = "macos")]
async fn check_videotoolbox(ffmpeg_path: &str) -> bool {
    has_encoder(ffmpeg_path, "h264_videotoolbox").await
}

#[cfg(not(target_os = "macos"))]
async fn check_videotoolbox(_ffmpeg_path: &str) -> bool {
    false
}

async fn has_encoder(ffmpeg_path: &str, encoder_name: &str) -> bool {
    let Ok(output) = Command::new(ffmpeg_path).arg("-encoders").output().await else {
        return false;
    };
    if !output.status.success() {
        return false;
    }
    String::from_utf8_lossy(&output.stdout).contains(encoder_name)
}

/// `-hwaccel`/encoder argument pair for the selected acceleration mode
/// and target codec.
pub fn hwaccel_args(accel: Acceleration, codec: &str) -> Vec<String> {
    match accel {
        Acceleration::Nvidia => vec![
            "-hwaccel".to_string(),
            "cuda".to_string(),
            "-c:v".to_string(),
            nvenc_encoder(codec).to_string(),
        ],
        Acceleration::Vaapi => vec![
            "-hwaccel".to_string(),
            "vaapi".to_string(),
            "-hwaccel_device".to_string(),
            "/dev/dri/renderD128".to_string(),
            "-hwaccel_output_format".to_string(),
            "vaapi".to_string(),
            "-c:v".to_string(),
            vaapi_encoder(codec).to_string(),
        ],
        Acceleration::Videotoolbox => vec![
            "-hwaccel".to_string(),
            "videotoolbox".to_string(),
            "-c:v".to_string(),
            videotoolbox_encoder(codec).to_string(),
        ],
        Acceleration::None | Acceleration::Auto => vec!["-c:v".to_string(), cpu_encoder(codec).to_string()],
    }
}

fn nvenc_encoder(codec: &str) -> &'static str {
    match codec {
        "hevc" | "h265" => "hevc_nvenc",
        _ => "h264_nvenc",
    }
}

fn vaapi_encoder(codec: &str) -> &'static str {
    match codec {
        "hevc" | "h265" => "hevc_vaapi",
        _ => "h264_vaapi",
    }
}

fn videotoolbox_encoder(codec: &str) -> &'static str {
    match codec {
        "hevc" | "h265" => "hevc_videotoolbox",
        _ => "h264_videotoolbox",
    }
}

fn cpu_encoder(codec: &str) -> &'static str {
    match codec {
        "hevc" | "h265" => "libx265",
        _ => "libx264",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_request_bypasses_probing() {
        // detect_acceleration is async only to probe subprocesses; an
        // explicit (non-Auto) request never touches them.
        let requested = Acceleration::Vaapi;
        assert_ne!(requested, Acceleration::Auto);
    }

    #[test]
    fn hwaccel_args_selects_codec_specific_encoder() {
        let args = hwaccel_args(Acceleration::Nvidia, "hevc");
        assert!(args.contains(&"hevc_nvenc".to_string()));

        let args = hwaccel_args(Acceleration::None, "h264");
        assert!(args.contains(&"libx264".to_string()));
    }
}
