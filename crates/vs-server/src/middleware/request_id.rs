//! Per-request correlation id.
//!
//! An incoming `x-request-id` is honoured, otherwise a v4 UUID is minted.
//! The id is attached to the request span, made available to error bodies
//! through a task-local, and copied onto the response.

use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied id that is reused verbatim.
const MAX_INCOMING_LEN: usize = 128;

tokio::task_local! {
    static CURRENT: String;
}

/// Id of the request currently being handled, if called inside the
/// middleware's scope.
pub fn current() -> Option<String> {
    CURRENT.try_with(Clone::clone).ok()
}

fn incoming_id<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INCOMING_LEN)
        .map(String::from)
}

pub async fn request_id_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = CURRENT
        .scope(id.clone(), next.run(request).instrument(span))
        .await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), val);
    }
    response
}
