//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::cache::static_cache_middleware;
use crate::middleware::rate_limit::{rate_limit_middleware, SharedLimiter};
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::auth::register,
        routes::auth::login,
        routes::videos::upload_video,
        routes::videos::list_videos,
        routes::videos::featured_videos,
        routes::videos::trending_videos,
        routes::videos::uploader_videos,
        routes::videos::get_video,
        routes::videos::record_view,
        routes::videos::delete_video,
        routes::comments::list_comments,
        routes::comments::create_comment,
        routes::users::get_profile,
        routes::users::update_profile,
        routes::users::user_videos,
        routes::users::creator_dashboard,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::auth::RegisterRequest,
        routes::auth::RegisterResponse,
        routes::auth::LoginRequest,
        routes::auth::LoginResponse,
        routes::videos::VideoResponse,
        routes::videos::UploadResponse,
        routes::videos::ViewResponse,
        routes::videos::MessageResponse,
        routes::comments::CommentResponse,
        routes::comments::CreateCommentRequest,
        routes::users::UserResponse,
        routes::users::UpdateProfileRequest,
        routes::users::DashboardResponse,
        routes::users::DashboardStats,
        vs_core::VideoStatus,
        vs_core::UserRole,
    )),
    modifiers(&BearerAuth)
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

fn limited(router: Router<AppContext>, limiter: Option<&SharedLimiter>) -> Router<AppContext> {
    match limiter {
        Some(l) => router.layer(middleware::from_fn_with_state(l.clone(), rate_limit_middleware)),
        None => router,
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {o:?}");
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}

/// Build the complete router.
pub fn build_router(ctx: AppContext) -> Router {
    let limiters = ctx.limiters.clone();
    let auth_layer = || middleware::from_fn_with_state(ctx.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));
    let auth_routes = limited(auth_routes, limiters.as_ref().map(|l| &l.auth));

    // Size is enforced while streaming, so the default body cap is lifted.
    let upload_routes = Router::new()
        .route("/videos/upload", post(routes::videos::upload_video))
        .layer(DefaultBodyLimit::disable());
    let upload_routes = limited(upload_routes, limiters.as_ref().map(|l| &l.uploads))
        .layer(auth_layer());

    let public_routes = Router::new()
        .route("/videos", get(routes::videos::list_videos))
        .route("/videos/featured", get(routes::videos::featured_videos))
        .route("/videos/trending", get(routes::videos::trending_videos))
        .route("/videos/{id}", get(routes::videos::get_video))
        .route("/videos/{id}/view", post(routes::videos::record_view))
        .route("/comments/{video_id}", get(routes::comments::list_comments))
        .route("/users/profile/{id}", get(routes::users::get_profile))
        .route("/users/{id}/videos", get(routes::users::user_videos));

    let protected_routes = Router::new()
        .route("/videos/user/{user_id}", get(routes::videos::uploader_videos))
        .route("/videos/{id}", delete(routes::videos::delete_video))
        .route("/comments/{video_id}", post(routes::comments::create_comment))
        .route("/users/profile", put(routes::users::update_profile))
        .route("/users/creator/dashboard", get(routes::users::creator_dashboard))
        .layer(auth_layer());

    let api = public_routes
        .merge(protected_routes)
        .merge(upload_routes)
        .merge(auth_routes);
    let api = limited(api, limiters.as_ref().map(|l| &l.api));

    let uploads = Router::new()
        .nest_service("/uploads", ServeDir::new(ctx.upload_root()))
        .layer(middleware::from_fn(static_cache_middleware));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .merge(uploads)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer(&ctx.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_upload_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/videos/upload"));
        assert!(doc.paths.paths.contains_key("/api/users/creator/dashboard"));
    }

    #[test]
    fn cors_accepts_configured_origins() {
        // Construction must not panic for valid or invalid entries.
        let _ = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
        let _ = cors_layer(&[]);
    }
}
