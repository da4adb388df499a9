//! HTTP middleware: request ID, bearer authentication, rate limiting and
//! static file cache headers.

pub mod auth;
pub mod cache;
pub mod rate_limit;
pub mod request_id;
