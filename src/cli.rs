use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidshare")]
#[command(author, version, about = "Video sharing backend with background transcoding")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the ingest pipeline once on a local file
    Process {
        #[arg(required = true)]
        input: PathBuf,

        /// Directory to write outputs into
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Probe a media file and display information
    Probe {
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate a configuration file
    Validate {
        /// Config file to validate (falls back to --config)
        config: Option<PathBuf>,
    },

    /// Generate a bcrypt password hash
    HashPassword { password: String },

    /// Display version information
    Version,
}
