//! 路由定义
//!
//! - 控制面：`/`、`/ws`（WebSocket 升级）
//! - 健康检查：`/health`
//! - 指标：`/metrics`

use super::AppState;
use super::handlers::*;
use axum::{Router, routing::get};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(control_socket))
        .route("/ws", get(control_socket))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
}
