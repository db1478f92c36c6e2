//! 检重秤模拟器服务：WebSocket 控制面 + 原始 TCP 数据面。
//!
//! - `/`、`/ws`：控制面 WebSocket
//! - `/health`：健康检查
//! - `/metrics`：发送计数快照
//! - 数据面：独立 TCP 端口，只写出成帧后的重量字节

pub mod data_plane;
pub mod handlers;
pub mod routes;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use cwsim_config::AppConfig;
use cwsim_telemetry::new_request_ids;
use cwsim_transmit::Transmitter;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub use data_plane::DataPlane;

#[derive(Clone)]
pub struct AppState {
    pub transmitter: Transmitter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(transmitter: Transmitter, config: AppConfig) -> Self {
        Self {
            transmitter,
            config: Arc::new(config),
        }
    }

    /// 按配置创建发送器。
    pub fn from_config(config: AppConfig) -> Self {
        let transmitter = Transmitter::new(config.preset_scope, config.default_preset.clone());
        Self::new(transmitter, config)
    }
}

/// 控制面路由（含 request_id/trace_id 注入与 HTTP 追踪）。
pub fn build_router(state: AppState) -> Router {
    routes::create_router()
        .with_state(state)
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
}

/// 每个 HTTP 请求（含 WebSocket 升级）在带 request_id/trace_id 的 span 内执行，
/// 两个 id 通过响应头回传。
async fn request_context(req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut response = next.run(req).instrument(span).await;
    let headers = response.headers_mut();
    for (name, value) in [
        ("x-request-id", ids.request_id),
        ("x-trace-id", ids.trace_id),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
    response
}
