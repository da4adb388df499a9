//! # vs-pipeline
//!
//! The asynchronous ingest pipeline that turns one uploaded source file into
//! web-deliverable outputs.
//!
//! - **[`PipelineSettings`]** -- the immutable encoding catalog: two container
//!   targets and the ordered rendition descriptors.
//! - **[`IngestPipeline`]** -- runs probe, container conversions and the
//!   rendition loop strictly in sequence and returns a [`ProcessingResult`].
//! - **[`EncodeGate`]** -- semaphore capping simultaneous encoder processes
//!   across all runs.
//! - **[`OutputRegistry`]** -- every output a run produces, deleted again if
//!   the run fails.
//! - **[`cleanup`]** -- best-effort removal of files after a settled run.

pub mod catalog;
pub mod cleanup;
pub mod gate;
pub mod orchestrator;
pub mod outputs;

pub use catalog::{ContainerTarget, PipelineSettings, RenditionDescriptor};
pub use cleanup::{cleanup, remove_output_dir};
pub use gate::EncodeGate;
pub use orchestrator::{
    IngestJob, IngestPipeline, ProcessingResult, RenditionOutput, RunState, StageObserver,
};
pub use outputs::OutputRegistry;
pub use vs_core::config::RenditionPolicy;
