//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>` and use `?` on any
//! `vs_core::Result`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so `IntoResponse` can be implemented for [`vs_core::Error`].
#[derive(Debug)]
pub struct AppError {
    inner: vs_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: vs_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn inner(&self) -> &vs_core::Error {
        &self.inner
    }
}

impl From<vs_core::Error> for AppError {
    fn from(e: vs_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "Server error in API handler");
        }

        // Client-facing message: the variant payload, without the
        // "Validation error: " style prefix.
        let message = match &self.inner {
            vs_core::Error::Unauthorized(m)
            | vs_core::Error::Forbidden(m)
            | vs_core::Error::Validation(m)
            | vs_core::Error::Conflict(m)
            | vs_core::Error::PayloadTooLarge(m)
            | vs_core::Error::UnsupportedMediaType(m) => m.clone(),
            other => other.to_string(),
        };

        let request_id = self.request_id.or_else(crate::middleware::request_id::current);
        let body = json!({
            "error": message,
            "code": self.inner.code(),
            "request_id": request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
