//! Route handlers for the HTTP API.

pub mod auth;
pub mod comments;
pub mod health;
pub mod users;
pub mod videos;

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;

use crate::context::AppContext;

/// Absolute origin used to turn stored file references into URLs:
/// `server.public_url` when configured, otherwise scheme and `Host` of the
/// request.
#[derive(Debug, Clone)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    /// URL for a reference relative to the upload root.
    pub fn file_url(&self, file_ref: &str) -> String {
        format!("{}/uploads/{}", self.0, file_ref.trim_start_matches('/'))
    }
}

impl FromRequestParts<AppContext> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        if let Some(url) = ctx.config.server.public_url.as_deref() {
            return Ok(Self(url.trim_end_matches('/').to_string()));
        }
        let header_str = |name: header::HeaderName| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let host = header_str(header::HOST).unwrap_or("localhost");
        let scheme = header_str(header::HeaderName::from_static("x-forwarded-proto"))
            .unwrap_or("http");
        Ok(Self(format!("{scheme}://{host}")))
    }
}

/// Parse a path segment into a typed id.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, entity: &str) -> vs_core::Result<T> {
    raw.parse()
        .map_err(|_| vs_core::Error::Validation(format!("Invalid {entity} ID")))
}
