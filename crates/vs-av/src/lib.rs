//! # vs-av
//!
//! External media tooling for the vidshare ingest pipeline.
//!
//! - **Tool discovery** ([`ToolRegistry`]) finds ffmpeg and ffprobe.
//! - **Command execution** ([`ToolCommand`]) runs a process with a timeout.
//! - **Probing** ([`probe::probe_file`]) maps ffprobe JSON into [`MediaMetadata`].
//! - **Encoding** ([`Encoder`], [`FfmpegEncoder`]) runs one encode described
//!   by [`EncodeOptions`] and resolves with the output path.

pub mod command;
pub mod encoder;
pub mod options;
pub mod probe;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{Encoder, FfmpegEncoder};
pub use options::EncodeOptions;
pub use probe::MediaMetadata;
pub use tools::{ToolInfo, ToolRegistry};
