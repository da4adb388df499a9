//! Registration and login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use vs_core::{Error, UserRole};
use vs_db::queries::users;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::issue_token;
use crate::routes::users::UserResponse;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: UserRole,
    pub username: String,
    pub user_id: String,
    pub email: String,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register(
    State(ctx): State<AppContext>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let (Some(username), Some(email), Some(password)) = (
        required(payload.username),
        required(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::Validation("Username, email and password are required".into()).into());
    };
    if !email.contains('@') {
        return Err(Error::Validation("Invalid email address".into()).into());
    }

    let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| Error::Internal(format!("bcrypt error: {e}")))?;

    let conn = vs_db::get_conn(&ctx.db)?;
    let user = users::create_user(
        &conn,
        &username,
        &email,
        &hash,
        payload.role.unwrap_or_default(),
    )?;
    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: UserResponse::from_model(&user),
        }),
    ))
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(email), Some(password)) = (required(payload.email), payload.password) else {
        return Err(Error::Validation("Email and password are required".into()).into());
    };

    let conn = vs_db::get_conn(&ctx.db)?;
    let user = users::get_user_by_email(&conn, &email)?
        .ok_or_else(|| Error::not_found("user", &email))?;

    let valid = bcrypt::verify(&password, &user.password_hash).unwrap_or(false);
    if !valid {
        return Err(Error::Unauthorized("Invalid credentials".into()).into());
    }

    let token = issue_token(&ctx.config.auth, user.id, &user.email, user.role)?;
    Ok(Json(LoginResponse {
        token,
        role: user.role,
        username: user.username,
        user_id: user.id.to_string(),
        email: user.email,
    }))
}
