//! HTTP surface over the Strand ledger and delta log.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::routes::{health, messages, streams, threads};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Threads
        .route("/threads", post(threads::create_thread))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route("/users/:user_id/threads", get(threads::list_user_threads))
        // Messages
        .route(
            "/threads/:thread_id/messages",
            get(messages::list_messages).post(messages::save_messages),
        )
        .route("/messages/:message_id/finalize", post(messages::finalize_message))
        // Streams
        .route("/threads/:thread_id/streams", get(streams::list_streams))
        .route("/streams/:stream_id/deltas", get(streams::read_deltas))
        .route("/streams/:stream_id/events", get(streams::tail_stream));

    api_routes
        .layer(axum_middleware::from_fn(middleware::logging::log_request))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}
