//! Scoped registration of the files one ingest run writes.
//!
//! Every output path is registered *before* its encode starts, so a partial
//! file left by a failed encoder is covered too. A registry that is neither
//! committed nor discarded cleans up synchronously when dropped (task abort,
//! panic).

use std::path::{Path, PathBuf};

/// Outputs written by one run into its exclusive output directory.
#[derive(Debug)]
pub struct OutputRegistry {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    armed: bool,
}

impl OutputRegistry {
    /// Create the output directory (and parents) and start tracking.
    pub async fn prepare(dir: &Path) -> vs_core::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
            paths: Vec::new(),
            armed: true,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn register(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete one registered output and stop tracking it.
    pub async fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
        remove_quietly(path).await;
    }

    /// Keep every output; the run succeeded.
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.armed = false;
        std::mem::take(&mut self.paths)
    }

    /// Delete every registered output, then the directory if it is empty.
    pub async fn discard(mut self) {
        self.armed = false;
        for path in std::mem::take(&mut self.paths) {
            remove_quietly(&path).await;
        }
        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            tracing::debug!("Output dir {} kept: {e}", self.dir.display());
        }
    }
}

impl Drop for OutputRegistry {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in &self.paths {
            let _ = std::fs::remove_file(path);
        }
        let _ = std::fs::remove_dir(&self.dir);
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove output {}: {e}", path.display()),
    }
}
