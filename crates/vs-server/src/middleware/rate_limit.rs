//! Governor-based rate limiting.
//!
//! One direct (global) limiter per route group: general API traffic, the
//! auth endpoints and uploads.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::json;
use vs_core::config::RateLimitConfig;

pub type SharedLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

pub fn per_minute(n: u32) -> SharedLimiter {
    Arc::new(RateLimiter::direct(Quota::per_minute(non_zero(n))))
}

pub fn per_hour(n: u32) -> SharedLimiter {
    Arc::new(RateLimiter::direct(Quota::per_hour(non_zero(n))))
}

/// Limiters for each route group. `None` when rate limiting is disabled.
#[derive(Clone)]
pub struct Limiters {
    pub api: SharedLimiter,
    pub auth: SharedLimiter,
    pub uploads: SharedLimiter,
}

impl Limiters {
    pub fn from_config(cfg: &RateLimitConfig) -> Option<Self> {
        cfg.enabled.then(|| Self {
            api: per_minute(cfg.api_per_minute),
            auth: per_minute(cfg.auth_per_minute),
            uploads: per_hour(cfg.uploads_per_hour),
        })
    }
}

impl std::fmt::Debug for Limiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiters").finish_non_exhaustive()
    }
}

/// Returns 429 once the group's quota is exhausted.
pub async fn rate_limit_middleware(
    State(limiter): State<SharedLimiter>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if limiter.check().is_err() {
        tracing::debug!(path = %request.uri().path(), "Rate limit exceeded");
        return (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            axum::Json(json!({
                "error": "Too many requests, please try again later",
                "code": "rate_limited",
            })),
        )
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_enforced() {
        let limiter = per_minute(2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn disabled_config_builds_nothing() {
        let cfg = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        assert!(Limiters::from_config(&cfg).is_none());
        assert!(Limiters::from_config(&RateLimitConfig::default()).is_some());
    }

    #[test]
    fn zero_quota_is_clamped() {
        let limiter = per_hour(0);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
