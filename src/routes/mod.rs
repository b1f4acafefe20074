//! HTTP route handlers.

pub mod auth;
pub mod playlists;
pub mod sessions;
pub mod songs;

use crate::AppState;
use axum::http::{HeaderValue, Method, header, request::Parts};
use axum::{Json, Router, routing::get};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub fn create_router(state: AppState) -> Router {
    // frontend URL plus localhost for dev
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                let origin = origin.to_str().unwrap_or("");
                origin == frontend_url
                    || origin.starts_with("http://localhost")
                    || origin.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(songs::routes())
        .merge(sessions::routes())
        .merge(playlists::routes())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "TuneSwipe API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
