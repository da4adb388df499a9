//! The [`Encoder`] seam between the ingest pipeline and the external encoder.
//!
//! The pipeline only ever talks to `dyn Encoder`, so tests can substitute a
//! fake that records calls and injects failures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::command::ToolCommand;
use crate::options::EncodeOptions;
use crate::probe::{self, MediaMetadata};
use crate::tools::ToolRegistry;

/// One external encoder backend.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Inspect `input` without decoding it.
    async fn probe(&self, input: &Path) -> vs_core::Result<MediaMetadata>;

    /// Run one encode of `input` into `output`.
    ///
    /// The parent directory of `output` must already exist. Resolves with the
    /// output path once exactly that file has been written. Failures are never
    /// retried here.
    async fn run_encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> vs_core::Result<PathBuf>;
}

/// [`Encoder`] backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    encode_timeout: Duration,
    probe_timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            encode_timeout: Duration::from_secs(3600),
            probe_timeout: Duration::from_secs(60),
        }
    }

    /// Build from a discovered registry; both tools are required.
    pub fn from_registry(
        tools: &ToolRegistry,
        pipeline: &vs_core::config::PipelineConfig,
    ) -> vs_core::Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?.to_path_buf();
        let ffprobe = tools.require("ffprobe")?.to_path_buf();
        Ok(Self::new(ffmpeg, ffprobe).with_timeouts(
            Duration::from_secs(pipeline.encode_timeout_secs),
            Duration::from_secs(pipeline.probe_timeout_secs),
        ))
    }

    pub fn with_timeouts(mut self, encode: Duration, probe: Duration) -> Self {
        self.encode_timeout = encode;
        self.probe_timeout = probe;
        self
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn probe(&self, input: &Path) -> vs_core::Result<MediaMetadata> {
        probe::probe_file(&self.ffprobe, input, self.probe_timeout).await
    }

    async fn run_encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> vs_core::Result<PathBuf> {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            let is_dir = tokio::fs::metadata(dir)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(vs_core::Error::tool(
                    "ffmpeg",
                    format!("output directory {} does not exist", dir.display()),
                ));
            }
        }

        ToolCommand::new(self.ffmpeg.clone())
            .args(options.to_args(input, output))
            .timeout(self.encode_timeout)
            .execute()
            .await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(vs_core::Error::tool(
                "ffmpeg",
                format!("finished without writing {}", output.display()),
            ));
        }

        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_registry_requires_both_tools() {
        let tools = ToolRegistry::from_paths([(
            "ffmpeg".to_string(),
            PathBuf::from("/usr/bin/ffmpeg"),
        )]);
        let err = FfmpegEncoder::from_registry(&tools, &Default::default()).unwrap_err();
        assert!(err.to_string().contains("ffprobe"));
    }

    #[tokio::test]
    async fn missing_output_dir_is_rejected_before_spawn() {
        let enc = FfmpegEncoder::new(PathBuf::from("/nonexistent/ffmpeg"), PathBuf::new());
        let err = enc
            .run_encode(
                Path::new("in.mp4"),
                Path::new("/nonexistent/dir/out.mp4"),
                &EncodeOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"), "got: {err}");
    }

    #[tokio::test]
    async fn output_parent_that_is_a_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let enc = FfmpegEncoder::new(PathBuf::from("/nonexistent/ffmpeg"), PathBuf::new());
        let err = enc
            .run_encode(
                Path::new("in.mp4"),
                &blocker.join("out.mp4"),
                &EncodeOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"), "got: {err}");
    }

    #[tokio::test]
    async fn spawn_failure_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let enc = FfmpegEncoder::new(PathBuf::from("/nonexistent/ffmpeg"), PathBuf::new());
        let err = enc
            .run_encode(
                Path::new("in.mp4"),
                &dir.path().join("out.mp4"),
                &EncodeOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, vs_core::Error::Tool { .. }));
    }
}
