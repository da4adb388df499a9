//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying `{id, email, role}`. The middleware guards
//! protected routes and injects an [`AuthUser`] into request extensions.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use vs_core::config::AuthConfig;
use vs_core::{Error, Result, UserId, UserRole};

use crate::context::AppContext;
use crate::error::AppError;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;
const MAX_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// The caller behind a verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Forbidden unless the caller is a creator.
    pub fn require_creator(&self, message: &str) -> Result<()> {
        match self.role {
            UserRole::Creator => Ok(()),
            UserRole::Consumer => Err(Error::Forbidden(message.to_string())),
        }
    }
}

pub fn issue_token(cfg: &AuthConfig, id: UserId, email: &str, role: UserRole) -> Result<String> {
    let now = Utc::now();
    let ttl = cfg.token_ttl_hours.min(MAX_TTL_HOURS) as i64;
    let claims = Claims {
        id: id.to_string(),
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl)).timestamp(),
    };
    encode(
        &Header::new(JWT_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
}

pub fn verify_token(cfg: &AuthConfig, token: &str) -> Result<AuthUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        &Validation::new(JWT_ALGORITHM),
    )
    .map_err(|e| Error::Unauthorized(format!("Invalid token: {e}")))?;

    let id = data
        .claims
        .id
        .parse()
        .map_err(|_| Error::Unauthorized("Invalid token subject".into()))?;

    Ok(AuthUser {
        id,
        email: data.claims.email,
        role: data.claims.role,
    })
}

/// Applied to protected routes only.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("No token provided".into()))?;

    let user = verify_token(&ctx.config.auth, token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
