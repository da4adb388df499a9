//! Best-effort file removal after a run has settled.
//!
//! Failures here are logged and swallowed: a leftover source file must never
//! turn a finished encode into an error.

use std::path::{Path, PathBuf};

/// Delete each listed file. Returns how many were actually removed.
pub async fn cleanup(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                removed += 1;
                tracing::debug!("Cleaned up {}", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cleanup skipped, already gone: {}", path.display());
            }
            Err(e) => {
                tracing::warn!("Cleanup failed for {}: {e}", path.display());
            }
        }
    }
    removed
}

/// Remove a whole per-video output directory. Returns `true` if it existed
/// and was removed.
pub async fn remove_output_dir(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Failed to remove output dir {}: {e}", dir.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_existing_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("source.mp4");
        std::fs::write(&a, b"data").unwrap();
        let missing = dir.path().join("gone.mp4");

        let removed = cleanup(&[a.clone(), missing]).await;
        assert_eq!(removed, 1);
        assert!(!a.exists());
    }

    #[tokio::test]
    async fn directory_path_is_logged_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        // remove_file on a directory fails; cleanup must swallow it.
        let removed = cleanup(&[dir.path().to_path_buf()]).await;
        assert_eq!(removed, 0);
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn output_dir_removed_recursively() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("processed").join("v1");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("v1-720p.mp4"), b"x").unwrap();

        assert!(remove_output_dir(&out).await);
        assert!(!out.exists());
        assert!(!remove_output_dir(&out).await);
    }
}
