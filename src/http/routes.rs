use super::handlers;
use super::state::AppState;
use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // One-shot capture
        .route(
            "/camera",
            get(handlers::camera_status).post(handlers::capture_once),
        )
        .route(
            "/camera/settings",
            get(handlers::get_camera_settings).put(handlers::put_camera_settings),
        )
        // Session lifecycle
        .route("/session", get(handlers::session_command))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
