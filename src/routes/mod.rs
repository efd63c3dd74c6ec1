//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - exercise API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Exercises
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/tasks", post(http::http_post_task))
        .route("/api/v1/tasks/:id/answer", post(http::http_post_answer))
        .route("/api/v1/tasks/:id/solution", get(http::http_get_solution))
        .route("/api/v1/tasks/:id/explain/:key", get(http::http_get_explain))
        .route("/api/v1/tasks/:id/ranking", post(http::http_post_ranking))
        .route("/api/v1/tasks/:id/sketch.svg", get(http::http_get_sketch))
        .route("/api/v1/accounts", get(http::http_get_accounts))
        // Letters
        .route("/api/v1/letters/check", post(http::http_post_letter_check))
        .route("/api/v1/letters/scenarios", get(http::http_get_letter_scenarios))
        .route("/api/v1/letters/scenario", get(http::http_get_random_scenario))
        .route("/api/v1/letters/assignments/:id", get(http::http_get_assignment))
        // Address exam
        .route("/api/v1/exams", post(http::http_post_exam))
        .route("/api/v1/exams/:id/answer", post(http::http_post_exam_answer))
        .route("/api/v1/exams/:id/certificate", get(http::http_get_certificate))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
