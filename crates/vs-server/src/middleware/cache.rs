//! Cache-Control for files served under `/uploads`.

use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "mov", "avi"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Cache policy for a request path, chosen by file extension.
pub fn cache_policy(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some(e) if MEDIA_EXTENSIONS.contains(&e) => "public, max-age=86400",
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => "public, max-age=604800",
        _ => "no-cache",
    }
}

pub async fn static_cache_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let policy = cache_policy(request.uri().path());
    let mut response = next.run(request).await;
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(policy));
    }
    response
}
