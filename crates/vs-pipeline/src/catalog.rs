//! The encoding catalog: container targets and rendition descriptors.
//!
//! Built once at start-up into a [`PipelineSettings`] and shared behind an
//! `Arc`; nothing here changes while the process runs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use vs_av::EncodeOptions;
use vs_core::config::{PipelineConfig, RenditionPolicy};
use vs_core::VideoId;

/// Audio bitrate shared by every output.
const AUDIO_BITRATE: &str = "128k";

// ---------------------------------------------------------------------------
// ContainerTarget
// ---------------------------------------------------------------------------

/// A delivery container the source is converted into at full resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerTarget {
    /// Key under which the output appears in `formats`.
    pub format: String,
    /// Extra `formats` keys pointing at the same file.
    pub aliases: Vec<String>,
    /// File name suffix after `<id>-`.
    pub file_suffix: String,
    pub options: EncodeOptions,
}

impl ContainerTarget {
    /// Open container: VP9 video with Opus audio.
    pub fn webm() -> Self {
        Self {
            format: "webm".into(),
            aliases: Vec::new(),
            file_suffix: "webm.webm".into(),
            options: EncodeOptions::new()
                .video("libvpx-vp9", "2000k")
                .audio("libopus", AUDIO_BITRATE)
                .format("webm"),
        }
    }

    /// Broadly compatible container: H.264 video with AAC audio.
    pub fn mp4() -> Self {
        Self {
            format: "mp4".into(),
            aliases: vec!["h264".into()],
            file_suffix: "h264.mp4".into(),
            options: EncodeOptions::new()
                .video("libx264", "2500k")
                .audio("aac", AUDIO_BITRATE)
                .preset("fast")
                .faststart(),
        }
    }

    pub fn output_path(&self, dir: &Path, id: VideoId) -> PathBuf {
        dir.join(format!("{id}-{}", self.file_suffix))
    }
}

// ---------------------------------------------------------------------------
// RenditionDescriptor
// ---------------------------------------------------------------------------

/// One fixed-size, fixed-bitrate re-encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenditionDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub video_bitrate: String,
}

impl RenditionDescriptor {
    pub fn new(label: &str, width: u32, height: u32, video_bitrate: &str) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            video_bitrate: video_bitrate.into(),
        }
    }

    /// Dimensions are applied directly; no aspect-ratio recompute.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::new()
            .video("libx264", &self.video_bitrate)
            .audio("aac", AUDIO_BITRATE)
            .size(self.width, self.height)
            .preset("fast")
            .faststart()
    }

    pub fn output_path(&self, dir: &Path, id: VideoId) -> PathBuf {
        dir.join(format!("{id}-{}.mp4", self.label))
    }
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// Immutable pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    webm: ContainerTarget,
    mp4: ContainerTarget,
    renditions: Vec<RenditionDescriptor>,
    policy: RenditionPolicy,
    thumbnails: bool,
    thumbnail_at_secs: f64,
    encode_slots: usize,
}

impl PipelineSettings {
    /// The standard catalog with default policy, one encode slot per CPU.
    pub fn standard() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            webm: ContainerTarget::webm(),
            mp4: ContainerTarget::mp4(),
            renditions: vec![
                RenditionDescriptor::new("720p", 1280, 720, "2500k"),
                RenditionDescriptor::new("480p", 854, 480, "1000k"),
                RenditionDescriptor::new("360p", 640, 360, "500k"),
            ],
            policy: cfg.rendition_policy,
            thumbnails: cfg.thumbnails,
            thumbnail_at_secs: 1.0,
            encode_slots: cfg.encode_slots(),
        }
    }

    pub fn with_policy(mut self, policy: RenditionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.thumbnails = enabled;
        self
    }

    pub fn with_encode_slots(mut self, slots: usize) -> Self {
        self.encode_slots = slots.max(1);
        self
    }

    /// Ordered rendition catalog.
    pub fn catalog(&self) -> &[RenditionDescriptor] {
        &self.renditions
    }

    /// Container targets in conversion order. The MP4 output feeds the
    /// rendition loop.
    pub fn containers(&self) -> [&ContainerTarget; 2] {
        [&self.webm, &self.mp4]
    }

    pub fn rendition_source(&self) -> &ContainerTarget {
        &self.mp4
    }

    pub fn policy(&self) -> RenditionPolicy {
        self.policy
    }

    pub fn thumbnails(&self) -> bool {
        self.thumbnails
    }

    pub fn thumbnail_at_secs(&self) -> f64 {
        self.thumbnail_at_secs
    }

    pub fn encode_slots(&self) -> usize {
        self.encode_slots
    }
}
