//! Video routes: upload, listings, fetch, view counting and deletion.

use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vs_core::{Error, Result, UserId, VideoId, VideoStatus};
use vs_db::models::Video;
use vs_db::queries::videos;

use crate::context::AppContext;
use crate::error::AppError;
use crate::ingest::spawn_ingest;
use crate::middleware::auth::AuthUser;
use crate::routes::{parse_id, BaseUrl};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "video";

pub const UPLOAD_ACCEPTED: &str = "Video uploaded successfully - processing in background";

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A video record with every file reference resolved to an absolute URL.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VideoResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub formats: BTreeMap<String, String>,
    pub qualities: BTreeMap<String, String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub views: i64,
    pub likes: i64,
    pub status: VideoStatus,
    pub error: Option<String>,
    pub uploader_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl VideoResponse {
    pub fn from_model(v: &Video, base: &BaseUrl) -> Self {
        let urls = |refs: &BTreeMap<String, String>| {
            refs.iter()
                .map(|(k, r)| (k.clone(), base.file_url(r)))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            id: v.id.to_string(),
            title: v.title.clone(),
            description: v.description.clone(),
            file_url: v.file_path.as_deref().map(|r| base.file_url(r)),
            thumbnail_url: v.thumbnail_path.as_deref().map(|r| base.file_url(r)),
            formats: urls(&v.formats),
            qualities: urls(&v.qualities),
            duration_secs: v.duration_secs,
            size_bytes: v.size_bytes,
            views: v.views,
            likes: v.likes,
            status: v.status,
            error: v.error.clone(),
            uploader_id: v.uploader_id.to_string(),
            created_at: v.created_at.clone(),
            updated_at: v.updated_at.clone(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub video: VideoResponse,
    pub status: VideoStatus,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListVideosParams {
    pub status: Option<String>,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ViewResponse {
    pub views: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// `<millis>-<nonce>-<name>` with everything outside `[A-Za-z0-9.-]` in the
/// name replaced. The nonce keeps same-named uploads apart.
pub fn stored_file_name(original: Option<&str>) -> String {
    let name = original
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload");
    let clean: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}-{}-{clean}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Stream one multipart field to `dest`, enforcing the size ceiling. The
/// partial file is removed on any failure.
async fn save_field(field: &mut Field<'_>, dest: &FsPath, max_bytes: u64) -> Result<u64> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await?;
    let outcome: Result<u64> = async {
        let mut written: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "File exceeds the {max_bytes} byte limit"
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }
    .await;

    if outcome.is_err() {
        drop(file);
        vs_pipeline::cleanup(&[dest.to_path_buf()]).await;
    }
    outcome
}

struct UploadForm {
    title: Option<String>,
    description: Option<String>,
    source: Option<PathBuf>,
}

/// Read every field of the form. A source saved before a later failure is
/// removed before the error is returned.
async fn read_form(ctx: &AppContext, multipart: &mut Multipart) -> Result<UploadForm> {
    let mut form = UploadForm {
        title: None,
        description: None,
        source: None,
    };
    match read_fields(ctx, multipart, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            if let Some(source) = form.source.take() {
                vs_pipeline::cleanup(&[source]).await;
            }
            Err(e)
        }
    }
}

fn malformed(e: axum::extract::multipart::MultipartError) -> Error {
    Error::Validation(format!("Malformed upload: {e}"))
}

async fn read_fields(ctx: &AppContext, multipart: &mut Multipart, form: &mut UploadForm) -> Result<()> {
    let storage = &ctx.config.storage;
    let text = |v: String| Some(v.trim().to_string()).filter(|s| !s.is_empty());

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => form.title = text(field.text().await.map_err(malformed)?),
            Some("description") => {
                form.description = text(field.text().await.map_err(malformed)?)
            }
            Some(FILE_FIELD) if form.source.is_none() => {
                let mime = field.content_type().unwrap_or("application/octet-stream");
                if !storage.is_allowed_mime(mime) {
                    return Err(Error::UnsupportedMediaType(format!(
                        "Unsupported file type '{mime}'"
                    )));
                }
                tokio::fs::create_dir_all(&storage.upload_dir).await?;
                let dest = storage
                    .upload_dir
                    .join(stored_file_name(field.file_name()));
                let size = save_field(&mut field, &dest, storage.max_upload_bytes).await?;
                tracing::debug!(path = %dest.display(), size, "Upload stored");
                form.source = Some(dest);
            }
            _ => {}
        }
    }
    Ok(())
}

/// POST /api/videos/upload
#[utoipa::path(
    post,
    path = "/api/videos/upload",
    request_body(content_type = "multipart/form-data", description = "Fields `title`, `description` and file `video`"),
    responses(
        (status = 201, description = "Accepted, processing in background", body = UploadResponse),
        (status = 400, description = "Missing fields or file"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a creator"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported file type")
    ),
    security(("bearer" = []))
)]
pub async fn upload_video(
    State(ctx): State<AppContext>,
    Extension(caller): Extension<AuthUser>,
    base: BaseUrl,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<UploadResponse>), AppError> {
    caller.require_creator("Access denied: Only creators can upload videos")?;

    let form = read_form(&ctx, &mut multipart).await?;
    let Some(source) = form.source else {
        return Err(Error::Validation("No video file uploaded".into()).into());
    };
    let (Some(title), Some(description)) = (form.title, form.description) else {
        vs_pipeline::cleanup(&[source]).await;
        return Err(Error::Validation("Title and description are required".into()).into());
    };

    let conn = vs_db::get_conn(&ctx.db)?;
    let video = match videos::create_placeholder(
        &conn,
        &title,
        &description,
        &ctx.file_ref(&source),
        caller.id,
    ) {
        Ok(v) => v,
        Err(e) => {
            vs_pipeline::cleanup(&[source]).await;
            return Err(e.into());
        }
    };
    tracing::info!(video_id = %video.id, uploader = %caller.id, "Upload accepted");

    spawn_ingest(&ctx, video.id, source)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: UPLOAD_ACCEPTED.into(),
            video: VideoResponse::from_model(&video, &base),
            status: VideoStatus::Processing,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/videos
#[utoipa::path(
    get,
    path = "/api/videos",
    params(ListVideosParams),
    responses((status = 200, description = "Videos, newest first", body = Vec<VideoResponse>))
)]
pub async fn list_videos(
    State(ctx): State<AppContext>,
    base: BaseUrl,
    Query(params): Query<ListVideosParams>,
) -> std::result::Result<Json<Vec<VideoResponse>>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<VideoStatus>)
        .transpose()?;
    let limit = params.limit.clamp(1, 200);
    let offset = params.offset.max(0);

    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_videos(&conn, status, offset, limit)?;
    Ok(Json(list.iter().map(|v| VideoResponse::from_model(v, &base)).collect()))
}

/// GET /api/videos/featured
#[utoipa::path(
    get,
    path = "/api/videos/featured",
    responses((status = 200, description = "Most viewed ready videos", body = Vec<VideoResponse>))
)]
pub async fn featured_videos(
    State(ctx): State<AppContext>,
    base: BaseUrl,
) -> std::result::Result<Json<Vec<VideoResponse>>, AppError> {
    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_featured(&conn)?;
    Ok(Json(list.iter().map(|v| VideoResponse::from_model(v, &base)).collect()))
}

/// GET /api/videos/trending
#[utoipa::path(
    get,
    path = "/api/videos/trending",
    responses((status = 200, description = "Most viewed recent videos", body = Vec<VideoResponse>))
)]
pub async fn trending_videos(
    State(ctx): State<AppContext>,
    base: BaseUrl,
) -> std::result::Result<Json<Vec<VideoResponse>>, AppError> {
    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_trending(&conn)?;
    Ok(Json(list.iter().map(|v| VideoResponse::from_model(v, &base)).collect()))
}

/// GET /api/videos/user/{user_id}
///
/// Every video of the given uploader, including ones still processing.
#[utoipa::path(
    get,
    path = "/api/videos/user/{user_id}",
    params(("user_id" = String, Path, description = "Uploader ID")),
    responses((status = 200, description = "Uploader's videos", body = Vec<VideoResponse>)),
    security(("bearer" = []))
)]
pub async fn uploader_videos(
    State(ctx): State<AppContext>,
    base: BaseUrl,
    Path(user_id): Path<String>,
) -> std::result::Result<Json<Vec<VideoResponse>>, AppError> {
    let uploader: UserId = parse_id(&user_id, "user")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_by_uploader(&conn, uploader)?;
    Ok(Json(list.iter().map(|v| VideoResponse::from_model(v, &base)).collect()))
}

// ---------------------------------------------------------------------------
// Single video
// ---------------------------------------------------------------------------

/// GET /api/videos/{id}
#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video record", body = VideoResponse),
        (status = 404, description = "Video not found")
    )
)]
pub async fn get_video(
    State(ctx): State<AppContext>,
    base: BaseUrl,
    Path(id): Path<String>,
) -> std::result::Result<Json<VideoResponse>, AppError> {
    let video_id: VideoId = parse_id(&id, "video")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let video = videos::get_video(&conn, video_id)?
        .ok_or_else(|| Error::not_found("video", video_id))?;
    Ok(Json(VideoResponse::from_model(&video, &base)))
}

/// POST /api/videos/{id}/view
#[utoipa::path(
    post,
    path = "/api/videos/{id}/view",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New view count", body = ViewResponse),
        (status = 404, description = "Video not found")
    )
)]
pub async fn record_view(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> std::result::Result<Json<ViewResponse>, AppError> {
    let video_id: VideoId = parse_id(&id, "video")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let views = videos::increment_views(&conn, video_id)?
        .ok_or_else(|| Error::not_found("video", video_id))?;
    Ok(Json(ViewResponse { views }))
}

/// DELETE /api/videos/{id}
#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the uploader"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_video(
    State(ctx): State<AppContext>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> std::result::Result<Json<MessageResponse>, AppError> {
    let video_id: VideoId = parse_id(&id, "video")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let video = videos::get_video(&conn, video_id)?
        .ok_or_else(|| Error::not_found("video", video_id))?;

    if video.uploader_id != caller.id {
        return Err(Error::Forbidden("Access denied: You can only delete your own videos".into()).into());
    }

    let Some(status) = videos::delete_video(&conn, video_id)? else {
        return Err(Error::not_found("video", video_id).into());
    };
    drop(conn);

    // Deleted while still processing: the ingest settles against a missing
    // record and discards its own outputs. Once settled, the files are ours.
    if status != VideoStatus::Processing {
        vs_pipeline::remove_output_dir(&ctx.processed_root().join(video_id.to_string())).await;
        vs_pipeline::cleanup(&[ctx.resolve_ref(&video.source_path)]).await;
    }
    tracing::info!(video_id = %video_id, "Video deleted");

    Ok(Json(MessageResponse {
        message: "Video deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_are_sanitised() {
        let name = stored_file_name(Some("My Holiday (1).mp4"));
        let mut parts = name.splitn(3, '-');
        assert!(parts.next().unwrap().parse::<i64>().is_ok());
        assert_eq!(parts.next().unwrap().len(), 32);
        assert_eq!(parts.next().unwrap(), "My_Holiday__1_.mp4");

        let name = stored_file_name(Some("../../etc/passwd"));
        assert!(name.ends_with("-passwd"));

        assert!(stored_file_name(None).ends_with("-upload"));
    }

    #[test]
    fn same_name_in_one_millisecond_stays_distinct() {
        let a = stored_file_name(Some("clip.mp4"));
        let b = stored_file_name(Some("clip.mp4"));
        assert_ne!(a, b);
    }
}
