//! Application setup: router assembly and shared state.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Extension;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerKernel;
use crate::server::middleware::{caller_identity_middleware, request_id_middleware};
use crate::server::routes::{
    create_post_handler, follow_handler, followers_handler, following_handler, health_handler,
    list_user_posts_handler, reset_handler, stats_handler, timeline_handler, unfollow_handler,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub kernel: Arc<ServerKernel>,
}

/// Build the Axum application router.
///
/// Background tasks (dispatcher, consumer, scheduler) are spawned by the
/// binary, not here; the router is self-contained so tests can drive it
/// directly.
pub fn build_app(kernel: Arc<ServerKernel>) -> Router {
    let state = AppState { kernel };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/v1/posts", post(create_post_handler))
        .route("/api/v1/users/:id/posts", get(list_user_posts_handler))
        .route(
            "/api/v1/users/:id/follow/:target",
            post(follow_handler).delete(unfollow_handler),
        )
        .route("/api/v1/users/:id/following", get(following_handler))
        .route("/api/v1/users/:id/followers", get(followers_handler))
        .route("/api/v1/users/:id/timeline", get(timeline_handler))
        .route("/actuator/health", get(health_handler))
        .route("/api/v1/demo/stats", get(stats_handler))
        .route("/api/v1/demo/reset", post(reset_handler))
        // Layers run outermost-last: request-id first, then identity, both
        // seeing the shared state below them.
        .layer(middleware::from_fn(caller_identity_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(Extension(state))
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
}
