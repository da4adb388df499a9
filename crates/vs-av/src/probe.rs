//! ffprobe-backed media inspection.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and keeps the handful of fields the ingest pipeline records: duration,
//! container format, byte size and the primary stream codecs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Metadata about an uploaded source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Duration in seconds.
    pub duration_secs: Option<f64>,
    /// ffprobe container name, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub format_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// Probe `input` with the ffprobe binary at `ffprobe`.
///
/// Any failure (spawn, non-zero exit, unparsable JSON, a file with no
/// streams) is reported as [`vs_core::Error::Probe`].
pub async fn probe_file(
    ffprobe: &Path,
    input: &Path,
    timeout: Duration,
) -> vs_core::Result<MediaMetadata> {
    let mut cmd = ToolCommand::new(ffprobe.to_path_buf());
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(input.to_string_lossy().as_ref())
    .timeout(timeout);

    let output = cmd.execute().await.map_err(|e| {
        vs_core::Error::Probe(format!("{}: {e}", input.display()))
    })?;

    parse_ffprobe_json(&output.stdout)
}

/// Parse the JSON document printed by ffprobe.
pub fn parse_ffprobe_json(json: &str) -> vs_core::Result<MediaMetadata> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| vs_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    if ff.streams.is_empty() {
        return Err(vs_core::Error::Probe("no media streams found".into()));
    }

    let format = ff.format.unwrap_or_default();
    let video = ff
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = ff
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaMetadata {
        duration_secs: format.duration.and_then(|s| s.parse::<f64>().ok()),
        format_name: format.format_name,
        size_bytes: format.size.and_then(|s| s.parse::<u64>().ok()),
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        video_codec: video.and_then(|v| v.codec_name.clone()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
    })
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}
