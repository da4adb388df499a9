//! Ingest orchestrator: probe, container conversions, rendition loop.
//!
//! One [`IngestPipeline`] is shared by every upload. Each call to
//! [`IngestPipeline::run`] walks a single source through
//! `Start -> Probed -> ContainersConverted -> RenditionsGenerated -> Completed`,
//! or ends in `Failed`. Steps within a run are strictly sequential; runs for
//! different videos only share the [`EncodeGate`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vs_av::{EncodeOptions, Encoder, MediaMetadata};
use vs_core::config::RenditionPolicy;
use vs_core::{Error, Result, VideoId};

use crate::catalog::PipelineSettings;
use crate::gate::EncodeGate;
use crate::outputs::OutputRegistry;

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Start,
    Probed,
    ContainersConverted,
    RenditionsGenerated,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Probed => "probed",
            Self::ContainersConverted => "containers_converted",
            Self::RenditionsGenerated => "renditions_generated",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Callback invoked on every state transition of every run.
pub struct StageObserver {
    callback: Box<dyn Fn(VideoId, RunState) + Send + Sync>,
}

impl StageObserver {
    pub fn new(callback: impl Fn(VideoId, RunState) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn send(&self, id: VideoId, state: RunState) {
        (self.callback)(id, state);
    }
}

impl fmt::Debug for StageObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageObserver").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Job and result
// ---------------------------------------------------------------------------

/// Input to one run.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub video_id: VideoId,
    pub source: PathBuf,
    /// Exclusive to this video: `<processed root>/<id>/`.
    pub output_dir: PathBuf,
}

impl IngestJob {
    pub fn new(video_id: VideoId, source: PathBuf, processed_root: &Path) -> Self {
        Self {
            video_id,
            source,
            output_dir: processed_root.join(video_id.to_string()),
        }
    }
}

/// A rendition that was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOutput {
    pub label: String,
    pub path: PathBuf,
}

/// Everything a completed run produced. Held in memory only; the caller
/// folds it into the video record.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub metadata: MediaMetadata,
    /// Container format key (and aliases) to output path.
    pub formats: BTreeMap<String, PathBuf>,
    /// Renditions in catalog order.
    pub qualities: Vec<RenditionOutput>,
    /// Preferred playable file.
    pub primary: PathBuf,
    pub thumbnail: Option<PathBuf>,
    /// Labels dropped under [`RenditionPolicy::Isolate`].
    pub skipped: Vec<String>,
}

impl ProcessingResult {
    /// Every distinct file the run wrote.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let all = self
            .formats
            .values()
            .chain(self.qualities.iter().map(|q| &q.path))
            .chain(self.thumbnail.iter());
        for p in all {
            if !paths.contains(p) {
                paths.push(p.clone());
            }
        }
        paths
    }
}

// ---------------------------------------------------------------------------
// IngestPipeline
// ---------------------------------------------------------------------------

/// Shared orchestrator for ingest runs.
pub struct IngestPipeline {
    encoder: Arc<dyn Encoder>,
    settings: Arc<PipelineSettings>,
    gate: EncodeGate,
    observer: Arc<StageObserver>,
}

impl IngestPipeline {
    pub fn new(encoder: Arc<dyn Encoder>, settings: Arc<PipelineSettings>) -> Self {
        let gate = EncodeGate::new(settings.encode_slots());
        Self {
            encoder,
            settings,
            gate,
            observer: Arc::new(StageObserver::noop()),
        }
    }

    pub fn with_observer(mut self, observer: StageObserver) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn gate(&self) -> &EncodeGate {
        &self.gate
    }

    /// Run one job to completion or failure.
    ///
    /// On failure every output registered so far is deleted before the error
    /// is returned. The source file is never touched here.
    pub async fn run(&self, job: &IngestJob) -> Result<ProcessingResult> {
        let mut state = RunState::Start;
        self.enter(job, state);

        match self.drive(job, &mut state).await {
            Ok(result) => {
                self.enter(job, RunState::Completed);
                Ok(result)
            }
            Err(e) => {
                tracing::error!(
                    video_id = %job.video_id,
                    failed_after = %state,
                    error = %e,
                    "Ingest run failed"
                );
                self.enter(job, RunState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&self, job: &IngestJob, state: &mut RunState) -> Result<ProcessingResult> {
        let metadata = self.encoder.probe(&job.source).await?;
        tracing::debug!(video_id = %job.video_id, ?metadata, "Probed source");
        *state = RunState::Probed;
        self.enter(job, *state);

        let mut outputs = OutputRegistry::prepare(&job.output_dir).await?;
        match self.encode_outputs(job, metadata, &mut outputs, state).await {
            Ok(result) => {
                outputs.commit();
                Ok(result)
            }
            Err(e) => {
                outputs.discard().await;
                Err(e)
            }
        }
    }

    async fn encode_outputs(
        &self,
        job: &IngestJob,
        metadata: MediaMetadata,
        outputs: &mut OutputRegistry,
        state: &mut RunState,
    ) -> Result<ProcessingResult> {
        let id = job.video_id;

        // Containers, sequentially. Both are required.
        let mut formats = BTreeMap::new();
        for target in self.settings.containers() {
            let out = target.output_path(&job.output_dir, id);
            outputs.register(out.clone());
            self.encode(&job.source, &out, &target.options)
                .await
                .map_err(|e| Error::pipeline(format!("convert {}", target.format), e.to_string()))?;
            formats.insert(target.format.clone(), out.clone());
            for alias in &target.aliases {
                formats.insert(alias.clone(), out.clone());
            }
        }
        *state = RunState::ContainersConverted;
        self.enter(job, *state);

        let mp4 = self
            .settings
            .rendition_source()
            .output_path(&job.output_dir, id);

        // Renditions in catalog order, all fed from the MP4 output.
        let mut qualities = Vec::new();
        let mut skipped = Vec::new();
        for desc in self.settings.catalog() {
            let out = desc.output_path(&job.output_dir, id);
            outputs.register(out.clone());
            match self.encode(&mp4, &out, &desc.encode_options()).await {
                Ok(path) => qualities.push(RenditionOutput {
                    label: desc.label.clone(),
                    path,
                }),
                Err(e) => match self.settings.policy() {
                    RenditionPolicy::AllOrNothing => {
                        return Err(Error::pipeline(
                            format!("rendition {}", desc.label),
                            e.to_string(),
                        ));
                    }
                    RenditionPolicy::Isolate => {
                        tracing::warn!(
                            video_id = %id,
                            rendition = %desc.label,
                            error = %e,
                            "Rendition failed; continuing without it"
                        );
                        outputs.remove(&out).await;
                        skipped.push(desc.label.clone());
                    }
                },
            }
        }
        *state = RunState::RenditionsGenerated;
        self.enter(job, *state);

        let thumbnail = if self.settings.thumbnails() {
            let out = job.output_dir.join(format!("{id}-thumb.jpg"));
            outputs.register(out.clone());
            let opts = EncodeOptions::still_frame(self.settings.thumbnail_at_secs());
            match self.encode(&mp4, &out, &opts).await {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(video_id = %id, error = %e, "Thumbnail extraction failed");
                    outputs.remove(&out).await;
                    None
                }
            }
        } else {
            None
        };

        let primary = qualities
            .first()
            .map(|q| q.path.clone())
            .unwrap_or_else(|| mp4.clone());

        Ok(ProcessingResult {
            metadata,
            formats,
            qualities,
            primary,
            thumbnail,
            skipped,
        })
    }

    /// One gated encoder invocation.
    async fn encode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<PathBuf> {
        let _permit = self.gate.acquire().await?;
        tracing::debug!(
            encoder = self.encoder.name(),
            output = %output.display(),
            "Encoding"
        );
        self.encoder.run_encode(input, output, options).await
    }

    fn enter(&self, job: &IngestJob, state: RunState) {
        tracing::info!(video_id = %job.video_id, state = %state, "Ingest state");
        self.observer.send(job.video_id, state);
    }
}
