//! 广播分发
//!
//! 一次成帧，相同字节写给每个当前在线的数据面客户端。单个客户端失败只移除该客户端，
//! 不影响同一轮中其他客户端的投递。

use crate::error::TransportError;
use crate::registry::ClientRegistry;
use cwsim_protocol::{frame, render_frame};
use cwsim_telemetry::{
    record_delivery_failure, record_frame_broadcast, record_frame_dropped_backpressure,
    record_frames_delivered,
};
use domain::ProtocolPreset;
use tracing::{debug, warn};

/// 单次广播结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 成功入队的客户端数
    pub delivered: usize,
    /// 因发送队列已满而错过本帧的客户端数
    pub dropped: usize,
    /// 因连接失效被移除的客户端数
    pub removed: usize,
}

/// 按 `preset` 成帧并广播 `weight`。
pub fn broadcast(
    registry: &mut ClientRegistry,
    weight: &str,
    preset: &ProtocolPreset,
) -> BroadcastReport {
    let bytes = frame(weight, preset);
    let mut report = BroadcastReport::default();
    let mut failed = Vec::new();

    debug!(
        target: "cwsim.transmit",
        frame = %render_frame(&bytes),
        preset = %preset.name,
        clients = registry.count_data_clients(),
        "broadcasting weight"
    );

    registry.for_each_data_client(|id, sink| match sink.send_frame(bytes.clone()) {
        Ok(()) => report.delivered += 1,
        Err(TransportError::Backpressure) => {
            report.dropped += 1;
            record_frame_dropped_backpressure();
            debug!(target: "cwsim.transmit", client = %id, "send queue full, frame dropped");
        }
        Err(err) => {
            warn!(target: "cwsim.transmit", client = %id, error = %err, "data client write failed");
            failed.push(id);
        }
    });

    for id in failed {
        if registry.unregister(id) {
            report.removed += 1;
            record_delivery_failure();
        }
    }

    record_frame_broadcast();
    record_frames_delivered(report.delivered as u64);
    report
}
