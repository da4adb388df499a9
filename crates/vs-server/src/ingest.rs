//! Background ingest: the bridge between an accepted upload and the video
//! record.
//!
//! Each accepted upload gets one detached task. The task runs the pipeline
//! and then settles the record exactly once, as `ready` or `failed`. The
//! request handler never waits on it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::task::JoinHandle;
use vs_core::{Error, Result, VideoId};
use vs_db::queries::videos::{self, ReadyRecord};
use vs_pipeline::{IngestJob, ProcessingResult};

use crate::context::AppContext;

/// Removes the id from the active set however the task ends.
struct ActiveIngest {
    ctx: AppContext,
    video_id: VideoId,
}

impl Drop for ActiveIngest {
    fn drop(&mut self) {
        self.ctx.active_ingests.remove(&self.video_id);
    }
}

/// Start processing `source` for `video_id` in the background.
///
/// Refused with `Conflict` while another run for the same id is active.
pub fn spawn_ingest(ctx: &AppContext, video_id: VideoId, source: PathBuf) -> Result<JoinHandle<()>> {
    use dashmap::mapref::entry::Entry;

    match ctx.active_ingests.entry(video_id) {
        Entry::Occupied(_) => {
            return Err(Error::Conflict(format!(
                "Video {video_id} is already being processed"
            )))
        }
        Entry::Vacant(slot) => {
            slot.insert(());
        }
    }

    let guard = ActiveIngest {
        ctx: ctx.clone(),
        video_id,
    };
    let ctx = ctx.clone();

    Ok(tokio::spawn(async move {
        let _guard = guard;
        let job = IngestJob::new(video_id, source.clone(), &ctx.processed_root());
        tracing::info!(video_id = %video_id, source = %source.display(), "Ingest started");

        match ctx.pipeline.run(&job).await {
            Ok(result) => {
                settle_ready(&ctx, &job, &result).await;
                vs_pipeline::cleanup(&[source]).await;
            }
            Err(e) => {
                if !settle_failed(&ctx, video_id, &e) {
                    vs_pipeline::cleanup(&[source]).await;
                }
            }
        }
    }))
}

async fn settle_ready(ctx: &AppContext, job: &IngestJob, result: &ProcessingResult) {
    let record = ready_record(ctx, result);
    let outcome = vs_db::get_conn(&ctx.db)
        .and_then(|conn| videos::mark_ready(&conn, job.video_id, &record));

    match outcome {
        Ok(true) => {
            tracing::info!(
                video_id = %job.video_id,
                qualities = result.qualities.len(),
                skipped = ?result.skipped,
                "Video ready"
            );
        }
        Ok(false) => {
            // Deleted while processing; nothing references the outputs.
            tracing::warn!(video_id = %job.video_id, "Video removed during processing, discarding outputs");
            vs_pipeline::remove_output_dir(&job.output_dir).await;
        }
        Err(e) => {
            tracing::error!(
                video_id = %job.video_id,
                error = %e,
                "Failed to record processed outputs; files left orphaned"
            );
        }
    }
}

/// Returns false only when the record no longer exists. The source is kept
/// for diagnosis otherwise.
fn settle_failed(ctx: &AppContext, video_id: VideoId, error: &Error) -> bool {
    let outcome = vs_db::get_conn(&ctx.db)
        .and_then(|conn| videos::mark_failed(&conn, video_id, &error.to_string()));
    match outcome {
        Ok(true) => {
            tracing::warn!(video_id = %video_id, error = %error, "Video processing failed");
            true
        }
        Ok(false) => {
            tracing::debug!(video_id = %video_id, "Failed video was already deleted");
            false
        }
        Err(e) => {
            tracing::error!(video_id = %video_id, error = %e, "Failed to mark video failed");
            true
        }
    }
}

fn ready_record(ctx: &AppContext, result: &ProcessingResult) -> ReadyRecord {
    let formats: BTreeMap<String, String> = result
        .formats
        .iter()
        .map(|(k, p)| (k.clone(), ctx.file_ref(p)))
        .collect();
    let qualities: BTreeMap<String, String> = result
        .qualities
        .iter()
        .map(|q| (q.label.clone(), ctx.file_ref(&q.path)))
        .collect();

    ReadyRecord {
        file_path: ctx.file_ref(&result.primary),
        thumbnail_path: result.thumbnail.as_deref().map(|p| ctx.file_ref(p)),
        formats,
        qualities,
        duration_secs: result.metadata.duration_secs,
        size_bytes: result.metadata.size_bytes.and_then(|n| i64::try_from(n).ok()),
    }
}
