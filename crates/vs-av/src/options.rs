//! Encode option sets and their ffmpeg argument rendering.

use std::path::Path;

/// Everything that varies between one encode and the next.
///
/// Built with the chained setters and rendered to an ffmpeg command line by
/// [`EncodeOptions::to_args`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeOptions {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    /// Output frame size, applied as-is (no aspect-ratio recompute).
    pub size: Option<(u32, u32)>,
    pub preset: Option<String>,
    /// Move the MP4 index to the front of the file.
    pub faststart: bool,
    /// Force the output container (`-f`).
    pub format: Option<String>,
    /// Extract one frame at this offset (seconds) instead of transcoding.
    pub still_frame_at: Option<f64>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video(mut self, codec: &str, bitrate: &str) -> Self {
        self.video_codec = Some(codec.into());
        self.video_bitrate = Some(bitrate.into());
        self
    }

    pub fn audio(mut self, codec: &str, bitrate: &str) -> Self {
        self.audio_codec = Some(codec.into());
        self.audio_bitrate = Some(bitrate.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn preset(mut self, preset: &str) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn faststart(mut self) -> Self {
        self.faststart = true;
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.into());
        self
    }

    /// A poster frame grab at `at_secs`.
    pub fn still_frame(at_secs: f64) -> Self {
        Self {
            still_frame_at: Some(at_secs),
            ..Self::default()
        }
    }

    /// Render the full ffmpeg argument list for `input` -> `output`.
    pub fn to_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
        ];

        if let Some(at) = self.still_frame_at {
            args.extend(["-ss".into(), format!("{at}")]);
        }

        args.extend(["-i".into(), input.to_string_lossy().to_string()]);

        if self.still_frame_at.is_some() {
            args.extend(["-frames:v", "1", "-q:v", "2", "-an"].map(String::from));
            args.push(output.to_string_lossy().to_string());
            return args;
        }

        if let Some(ref c) = self.video_codec {
            args.extend(["-c:v".into(), c.clone()]);
        }
        if let Some(ref c) = self.audio_codec {
            args.extend(["-c:a".into(), c.clone()]);
        }
        if let Some(ref b) = self.video_bitrate {
            args.extend(["-b:v".into(), b.clone()]);
        }
        if let Some(ref b) = self.audio_bitrate {
            args.extend(["-b:a".into(), b.clone()]);
        }
        if let Some((w, h)) = self.size {
            args.extend(["-s".into(), format!("{w}x{h}")]);
        }
        if let Some(ref p) = self.preset {
            args.extend(["-preset".into(), p.clone()]);
        }
        if self.faststart {
            args.extend(["-movflags".into(), "+faststart".into()]);
        }
        if let Some(ref f) = self.format {
            args.extend(["-f".into(), f.clone()]);
        }

        args.push(output.to_string_lossy().to_string());
        args
    }
}
