//! 追踪、请求 ID 与发送计数。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 发送计数快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub ticks_fired: u64,
    pub frames_broadcast: u64,
    pub frames_delivered: u64,
    pub frames_dropped_backpressure: u64,
    pub delivery_failures: u64,
    pub validation_rejected: u64,
    pub protocol_errors: u64,
    pub control_sessions_opened: u64,
    pub data_clients_opened: u64,
}

/// 进程级发送计数。
pub struct TelemetryMetrics {
    ticks_fired: AtomicU64,
    frames_broadcast: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped_backpressure: AtomicU64,
    delivery_failures: AtomicU64,
    validation_rejected: AtomicU64,
    protocol_errors: AtomicU64,
    control_sessions_opened: AtomicU64,
    data_clients_opened: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            ticks_fired: AtomicU64::new(0),
            frames_broadcast: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_dropped_backpressure: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            validation_rejected: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            control_sessions_opened: AtomicU64::new(0),
            data_clients_opened: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_fired: self.ticks_fired.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped_backpressure: self
                .frames_dropped_backpressure
                .load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            validation_rejected: self.validation_rejected.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            control_sessions_opened: self.control_sessions_opened.load(Ordering::Relaxed),
            data_clients_opened: self.data_clients_opened.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录定时发送触发次数。
pub fn record_tick() {
    metrics().ticks_fired.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次广播（无论接收方数量）。
pub fn record_frame_broadcast() {
    metrics().frames_broadcast.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功入队到数据面客户端的帧数。
pub fn record_frames_delivered(count: u64) {
    metrics()
        .frames_delivered
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录因客户端发送队列已满而丢弃的帧。
pub fn record_frame_dropped_backpressure() {
    metrics()
        .frames_dropped_backpressure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录因写失败被移除的客户端。
pub fn record_delivery_failure() {
    metrics().delivery_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录被拒绝的控制消息（校验失败）。
pub fn record_validation_rejected() {
    metrics()
        .validation_rejected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录无法解析的控制消息。
pub fn record_protocol_error() {
    metrics().protocol_errors.fetch_add(1, Ordering::Relaxed);
}

pub fn record_control_session_opened() {
    metrics()
        .control_sessions_opened
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_data_client_opened() {
    metrics()
        .data_clients_opened
        .fetch_add(1, Ordering::Relaxed);
}
