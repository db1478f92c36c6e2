//! 发送计数快照。
//!
//! - GET /metrics

use api_contract::MetricsSnapshotDto;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cwsim_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(MetricsSnapshotDto {
            ticks_fired: snapshot.ticks_fired,
            frames_broadcast: snapshot.frames_broadcast,
            frames_delivered: snapshot.frames_delivered,
            frames_dropped_backpressure: snapshot.frames_dropped_backpressure,
            delivery_failures: snapshot.delivery_failures,
            validation_rejected: snapshot.validation_rejected,
            protocol_errors: snapshot.protocol_errors,
            control_sessions_opened: snapshot.control_sessions_opened,
            data_clients_opened: snapshot.data_clients_opened,
        }),
    )
        .into_response()
}
