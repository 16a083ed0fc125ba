use std::path::Path;
use std::process::{Command, Stdio};

use crate::foundation::error::{StickerError, StickerResult};

/// Structural metadata read from a media file.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    /// Container-level duration in seconds, when the container reports one.
    pub duration: Option<f64>,
}

impl ProbeResult {
    pub fn is_landscape_or_square(&self) -> bool {
        self.width >= self.height
    }
}

/// Probe `path` through `ffprobe`.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn probe(path: &Path) -> StickerResult<ProbeResult> {
    if !path.is_file() {
        return Err(StickerError::probe(format!(
            "'{}' does not exist or is not a file",
            path.display()
        )));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StickerError::probe(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(StickerError::probe(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let result = parse_ffprobe_json(&out.stdout)?;
    tracing::debug!(
        width = result.width,
        height = result.height,
        duration = ?result.duration,
        "probed"
    );
    Ok(result)
}

/// Interpret `ffprobe -print_format json -show_streams -show_format` output.
///
/// Dimensions come from the first video stream; duration from the format section.
pub fn parse_ffprobe_json(bytes: &[u8]) -> StickerResult<ProbeResult> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize, Default)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        #[serde(default)]
        format: ProbeFormat,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| StickerError::probe(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| StickerError::probe("no decodable video stream found"))?;
    let width = stream
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| StickerError::probe("missing video width from ffprobe"))?;
    let height = stream
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| StickerError::probe("missing video height from ffprobe"))?;

    // ffprobe prints "N/A" for containers without a duration field.
    let duration = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    Ok(ProbeResult {
        width,
        height,
        duration,
    })
}
