//! vs-server: HTTP API and background ingest for vidshare.
//!
//! - Axum API with JWT authentication, governor rate limits and OpenAPI docs
//! - Multipart upload endpoint that hands accepted files to a detached
//!   ingest task
//! - Static delivery of uploads and processed outputs
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod ingest;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vs_av::{FfmpegEncoder, ToolRegistry};
use vs_core::config::Config;
use vs_pipeline::{IngestPipeline, PipelineSettings};

use crate::context::AppContext;

/// Start the server and run until a shutdown signal arrives.
pub async fn start(config: Config) -> vs_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // Database.
    let db_path = &config.server.db_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db = vs_db::init_pool(&db_path.to_string_lossy())?;
    let interrupted = vs_db::queries::videos::fail_interrupted(&*vs_db::get_conn(&db)?)?;
    if interrupted > 0 {
        tracing::warn!("Marked {interrupted} interrupted ingest(s) as failed");
    }

    // Storage.
    tokio::fs::create_dir_all(config.storage.processed_dir()).await?;
    tracing::info!("Serving uploads from {}", config.storage.upload_dir.display());

    // External tools.
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }
    let encoder = FfmpegEncoder::from_registry(&tools, &config.pipeline)?;

    // Pipeline.
    let settings = PipelineSettings::from_config(&config.pipeline);
    tracing::info!(
        encode_slots = settings.encode_slots(),
        policy = ?settings.policy(),
        "Ingest pipeline ready"
    );
    let pipeline = Arc::new(IngestPipeline::new(Arc::new(encoder), Arc::new(settings)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vs_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(db, config, tools, pipeline);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    serve(ctx, listener, CancellationToken::new()).await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve the API on an already-bound listener until a signal arrives or
/// `cancel` fires.
pub async fn serve(
    ctx: AppContext,
    listener: tokio::net::TcpListener,
    cancel: CancellationToken,
) -> vs_core::Result<()> {
    let app = router::build_router(ctx.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Server error: {e}")))?;

    let pending = ctx.active_ingests.len();
    if pending > 0 {
        tracing::warn!(
            "{pending} ingest(s) still running at shutdown; they will be marked failed on next start"
        );
    }
    Ok(())
}

/// Wait for SIGINT, SIGTERM or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
