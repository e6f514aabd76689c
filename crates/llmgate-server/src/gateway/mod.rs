//! HTTP gateway (Axum) over the cache-aware orchestrator.
//!
//! This module is primarily used by the `llmgate` server binary.

pub mod error;
pub mod handler;
pub mod payload;
pub mod request_id;
pub mod state;


use axum::{
    Json, Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use handler::{chat_handler, chat_stream_handler, summarize_handler};
pub use request_id::{RequestId, assign_request_id};
pub use state::HandlerState;

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/summarize", post(summarize_handler))
        .layer(middleware::from_fn(assign_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    Json(HealthResponse { status: "ok" }).into_response()
}
