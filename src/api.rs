//! HTTP ingress for ticket-update notifications
//!
//! A single endpoint accepting an opaque text body. The response is decided
//! synchronously (accept/reject); actual processing is deferred to the
//! coalescer's delay timer.

use crate::webhook::{WebhookCoalescer, WebhookDisposition};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coalescer: Arc<WebhookCoalescer>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/ticket-update", post(receive_ticket_update))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn receive_ticket_update(
    State(state): State<AppState>,
    body: String,
) -> impl IntoResponse {
    match state.coalescer.accept(&body) {
        Ok(WebhookDisposition::Scheduled) => (StatusCode::OK, "notification scheduled"),
        Ok(WebhookDisposition::NoRecipient) => (StatusCode::OK, "no recipient"),
        Err(error) => {
            tracing::warn!(%error, "Rejecting notification payload");
            (StatusCode::BAD_REQUEST, "invalid notification payload")
        }
    }
}
