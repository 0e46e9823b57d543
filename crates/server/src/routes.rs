pub mod admin;
pub mod auth;
pub mod token;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::errors::ApiError;
use crate::openapi::ApiDoc;
use auth::ServerState;

#[utoipa::path(get, path = "/api/health/", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Serve a local directory under a URL prefix such as `/media/`.
fn serve_dir(router: Router<ServerState>, prefix: &str, root: &str) -> Router<ServerState> {
    let mount = prefix.trim_end_matches('/');
    if mount.is_empty() {
        warn!(%prefix, "refusing to serve files at the root path");
        return router;
    }
    router.nest_service(mount, ServeDir::new(root))
}

/// Build the full application router, including public, protected, and admin routes
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let bearer = middleware::from_fn_with_state(state.clone(), auth::require_bearer_token);

    // Public routes
    let public = Router::new()
        .route("/api/health/", get(health))
        .route("/api/token/refresh/", post(token::refresh))
        .route("/api/auth/register/", post(auth::register))
        .route("/api/auth/login/", post(auth::login));

    // Bearer-protected routes
    let protected = Router::new()
        .route("/api/auth/logout/", post(auth::logout))
        .route(
            "/api/auth/profile/",
            get(auth::profile).put(auth::update_profile).patch(auth::update_profile),
        )
        .route_layer(bearer.clone());

    // Admin routes (staff checked per handler)
    let admin_routes = Router::new()
        .route("/admin/users/", get(admin::list_users))
        .route("/admin/users/:id/", get(admin::get_user).patch(admin::update_user))
        .route_layer(bearer);

    let mut app = public
        .merge(protected)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Local media/static files only in development
    if state.settings.debug {
        let settings = state.settings.clone();
        app = serve_dir(app, &settings.media_url, &settings.media_root);
        app = serve_dir(app, &settings.static_url, &settings.static_root);
    }

    app.fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
