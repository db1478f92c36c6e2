//! HTTP / WebSocket handlers

mod control;
mod metrics;

pub use control::{control_socket, forward_notices, handle_control_text};
pub use metrics::get_metrics;

use axum::{Json, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
