mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use vs_av::{FfmpegEncoder, ToolRegistry};
use vs_core::config::Config;
use vs_core::VideoId;
use vs_pipeline::{IngestJob, IngestPipeline, PipelineSettings};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidshare server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    vs_server::start(config).await?;
    tracing::info!("Shut down cleanly");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidshare=trace,vs_server=trace,vs_pipeline=trace,vs_av=debug,vs_db=debug,tower_http=debug".to_string()
        } else {
            "vidshare=debug,vs_server=debug,vs_pipeline=debug,vs_av=info,vs_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Process { input, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(process_file(&input, &output, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::HashPassword { password } => hash_password(&password),
        Commands::Version => {
            println!("vidshare {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_encoder(config: &Config) -> Result<FfmpegEncoder> {
    let tools = ToolRegistry::discover(&config.tools);
    Ok(FfmpegEncoder::from_registry(&tools, &config.pipeline)?)
}

async fn process_file(input: &Path, output: &Path, config_path: Option<&Path>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let config = Config::load_or_default(config_path);
    let encoder = build_encoder(&config)?;
    let settings = PipelineSettings::from_config(&config.pipeline);
    let pipeline = IngestPipeline::new(Arc::new(encoder), Arc::new(settings));

    let job = IngestJob::new(VideoId::new(), input.to_path_buf(), output);
    tracing::info!("Processing {:?} into {:?}", input, job.output_dir);

    let result = pipeline.run(&job).await?;

    println!("Processing complete: {}", job.video_id);
    if let Some(duration) = result.metadata.duration_secs {
        println!("Duration: {duration:.2}s");
    }
    println!("\nFormats:");
    for (format, path) in &result.formats {
        println!("  {format:<6} {}", path.display());
    }
    println!("\nQualities:");
    for rendition in &result.qualities {
        println!("  {:<6} {}", rendition.label, rendition.path.display());
    }
    if !result.skipped.is_empty() {
        println!("  skipped: {}", result.skipped.join(", "));
    }
    println!("\nPrimary: {}", result.primary.display());
    if let Some(ref thumb) = result.thumbnail {
        println!("Thumbnail: {}", thumb.display());
    }

    Ok(())
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;
    let timeout = std::time::Duration::from_secs(config.pipeline.probe_timeout_secs);
    let metadata = vs_av::probe::probe_file(ffprobe, file, timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    if let Some(ref format) = metadata.format_name {
        println!("Container: {format}");
    }
    if let Some(size) = metadata.size_bytes {
        println!("Size: {size} bytes");
    }
    if let Some(duration) = metadata.duration_secs {
        let secs = duration as u64;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let (Some(w), Some(h)) = (metadata.width, metadata.height) {
        print!("Video: {w}x{h}");
        if let Some(ref codec) = metadata.video_codec {
            print!(" {codec}");
        }
        println!();
    }
    if let Some(ref codec) = metadata.audio_codec {
        println!("Audio: {codec}");
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg and ffprobe are both required to process uploads.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Upload dir: {}", config.storage.upload_dir.display());
    println!("  Max upload: {} bytes", config.storage.max_upload_bytes);
    println!("  Encode slots: {}", config.pipeline.encode_slots());
    println!("  Rendition policy: {:?}", config.pipeline.rendition_policy);
    println!("  Rate limiting: {}", config.rate_limit.enabled);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    println!("{}", hash);
    Ok(())
}
