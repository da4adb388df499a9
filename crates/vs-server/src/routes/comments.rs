//! Comments on a video.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use vs_core::{Error, VideoId};
use vs_db::models::Comment;
use vs_db::queries::{comments, videos};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::routes::parse_id;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub created_at: String,
}

impl CommentResponse {
    fn from_model(c: &Comment) -> Self {
        Self {
            id: c.id.to_string(),
            video_id: c.video_id.to_string(),
            user_id: c.user_id.to_string(),
            username: c.username.clone(),
            text: c.text.clone(),
            created_at: c.created_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    pub text: Option<String>,
}

/// GET /api/comments/{video_id}
#[utoipa::path(
    get,
    path = "/api/comments/{video_id}",
    params(("video_id" = String, Path, description = "Video ID")),
    responses((status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>))
)]
pub async fn list_comments(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let list = comments::list_comments_for_video(&conn, video_id)?;
    Ok(Json(list.iter().map(CommentResponse::from_model).collect()))
}

/// POST /api/comments/{video_id}
#[utoipa::path(
    post,
    path = "/api/comments/{video_id}",
    params(("video_id" = String, Path, description = "Video ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Missing text"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_comment(
    State(ctx): State<AppContext>,
    Extension(caller): Extension<AuthUser>,
    Path(video_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    let text = payload
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Validation("Comment text required".into()))?;

    let conn = vs_db::get_conn(&ctx.db)?;
    if videos::get_video(&conn, video_id)?.is_none() {
        return Err(Error::not_found("video", video_id).into());
    }
    let comment = comments::create_comment(&conn, video_id, caller.id, &text)?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from_model(&comment))))
}
