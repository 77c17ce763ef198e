//! Axum router construction.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the full application router.
///
/// Everything under `/api` passes through the auth middleware; `/health`
/// does not.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Batch operations
        .route(
            "/merge-versions/movies/merge",
            post(routes::merge::merge_movies),
        )
        .route(
            "/merge-versions/movies/split",
            post(routes::merge::split_movies),
        )
        .route(
            "/merge-versions/episodes/merge",
            post(routes::merge::merge_episodes),
        )
        .route(
            "/merge-versions/episodes/split",
            post(routes::merge::split_episodes),
        )
        .route("/merge-versions/status", get(routes::merge::status))
        // Items
        .route("/items/{id}", get(routes::items::get_item))
        .route("/items/{id}/split", post(routes::items::split_item))
        // Events
        .route("/events", get(routes::events::events_handler))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
