//! Profiles and the creator dashboard.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use vs_core::{Error, UserId, UserRole};
use vs_db::models::User;
use vs_db::queries::{users, videos};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::routes::videos::VideoResponse;
use crate::routes::{parse_id, BaseUrl};

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_model(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role,
            bio: u.bio.clone(),
            created_at: u.created_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

fn nonempty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_videos: i64,
    pub total_views: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub videos: Vec<VideoResponse>,
    pub stats: DashboardStats,
}

/// GET /api/users/profile/{id}
#[utoipa::path(
    get,
    path = "/api/users/profile/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id: UserId = parse_id(&id, "user")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let user = users::get_user_by_id(&conn, user_id)?
        .ok_or_else(|| Error::not_found("user", user_id))?;
    Ok(Json(UserResponse::from_model(&user)))
}

/// PUT /api/users/profile
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 409, description = "Username or email taken")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile(
    State(ctx): State<AppContext>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let conn = vs_db::get_conn(&ctx.db)?;
    let updated = users::update_profile(
        &conn,
        caller.id,
        nonempty(&payload.username),
        nonempty(&payload.email),
        payload.bio.as_deref(),
    )?;
    if !updated {
        return Err(Error::not_found("user", caller.id).into());
    }

    let user = users::get_user_by_id(&conn, caller.id)?
        .ok_or_else(|| Error::not_found("user", caller.id))?;
    Ok(Json(UserResponse::from_model(&user)))
}

/// GET /api/users/{id}/videos
///
/// Public listing: only videos that finished processing.
#[utoipa::path(
    get,
    path = "/api/users/{id}/videos",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Ready videos by this user", body = Vec<VideoResponse>))
)]
pub async fn user_videos(
    State(ctx): State<AppContext>,
    base: BaseUrl,
    Path(id): Path<String>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let user_id: UserId = parse_id(&id, "user")?;
    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_by_uploader(&conn, user_id)?;
    Ok(Json(
        list.iter()
            .filter(|v| v.status == vs_core::VideoStatus::Ready)
            .map(|v| VideoResponse::from_model(v, &base))
            .collect(),
    ))
}

/// GET /api/users/creator/dashboard
#[utoipa::path(
    get,
    path = "/api/users/creator/dashboard",
    responses(
        (status = 200, description = "Creator dashboard", body = DashboardResponse),
        (status = 403, description = "Not a creator")
    ),
    security(("bearer" = []))
)]
pub async fn creator_dashboard(
    State(ctx): State<AppContext>,
    Extension(caller): Extension<AuthUser>,
    base: BaseUrl,
) -> Result<Json<DashboardResponse>, AppError> {
    caller.require_creator("Access denied: Only creators can view the dashboard")?;

    let conn = vs_db::get_conn(&ctx.db)?;
    let list = videos::list_by_uploader(&conn, caller.id)?;
    let stats = videos::uploader_stats(&conn, caller.id)?;

    Ok(Json(DashboardResponse {
        videos: list.iter().map(|v| VideoResponse::from_model(v, &base)).collect(),
        stats: DashboardStats {
            total_videos: stats.total_videos,
            total_views: stats.total_views,
        },
    }))
}
