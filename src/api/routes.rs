//! Router assembly: wires every handler onto its path and attaches the
//! CORS/tracing layers the whole service shares.

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::trace_requests;
use super::state::ApiState;

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/auth/apple", post(handlers::auth_apple))
        .route("/auth/apple/mock", post(handlers::auth_apple_mock))
        .route("/watch_events", post(handlers::submit_watch_events))
        .route("/app_interactions", post(handlers::submit_app_interaction))
        .route("/context", get(handlers::get_context))
        .route("/user/reset", post(handlers::reset_user_data))
        .layer(axum::middleware::from_fn(trace_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
