//! Shared application state.
//!
//! [`AppContext`] is cloned into every handler and every background ingest
//! task. Everything in it is immutable after start-up except the set of
//! active ingests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use vs_av::ToolRegistry;
use vs_core::config::Config;
use vs_core::VideoId;
use vs_db::DbPool;
use vs_pipeline::IngestPipeline;

use crate::middleware::rate_limit::Limiters;

#[derive(Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub pipeline: Arc<IngestPipeline>,
    /// Videos with an ingest task in flight.
    pub active_ingests: Arc<DashMap<VideoId, ()>>,
    pub limiters: Option<Limiters>,
}

impl AppContext {
    pub fn new(
        db: DbPool,
        config: Config,
        tools: Arc<ToolRegistry>,
        pipeline: Arc<IngestPipeline>,
    ) -> Self {
        let limiters = Limiters::from_config(&config.rate_limit);
        Self {
            db,
            config: Arc::new(config),
            tools,
            pipeline,
            active_ingests: Arc::new(DashMap::new()),
            limiters,
        }
    }

    /// Root of everything served under `/uploads`.
    pub fn upload_root(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    pub fn processed_root(&self) -> PathBuf {
        self.config.storage.processed_dir()
    }

    /// Reference stored in the database for a file under the upload root:
    /// the relative path with `/` separators.
    pub fn file_ref(&self, path: &Path) -> String {
        let rel = path.strip_prefix(self.upload_root()).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Inverse of [`file_ref`](Self::file_ref).
    pub fn resolve_ref(&self, file_ref: &str) -> PathBuf {
        file_ref
            .split('/')
            .fold(self.upload_root().to_path_buf(), |acc, part| acc.join(part))
    }
}
