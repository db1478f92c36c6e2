//! 控制面 WebSocket
//!
//! 每个连接注册为一个控制会话：入站文本帧解析为控制消息并应用到发送器，
//! 出站通知经有界通道由独立任务写回。连接结束时注销会话（同时停止其连续发送）。

use crate::AppState;
use api_contract::{ControlMessage, ControlNotice, ProtocolError};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use cwsim_telemetry::record_protocol_error;
use cwsim_transmit::Transmitter;
use domain::SessionId;
use futures::{Sink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn control_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let (notices, outbox) = mpsc::channel::<ControlNotice>(state.config.notice_buffer);
    let transmitter = state.transmitter;
    let session = transmitter.open_control_session(Arc::new(notices));
    info!(target: "cwsim.control", session = %session, "control session connected");

    let forward = tokio::spawn(forward_notices(
        sender,
        outbox,
        transmitter.clone(),
        session,
    ));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => handle_control_text(&transmitter, session, &text),
            Ok(Message::Binary(_)) => protocol_error(session, &ProtocolError::NotText),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(target: "cwsim.control", session = %session, error = %err, "control socket read failed");
                break;
            }
        }
    }

    transmitter.close(session);
    let _ = forward.await;
    info!(target: "cwsim.control", session = %session, "control session disconnected");
}

/// 把通知队列写回 WebSocket。
///
/// 会话被注销后队列关闭，任务随之结束；写失败时立即注销会话（同时停止其连续发送）。
pub async fn forward_notices<S>(
    mut sink: S,
    mut outbox: mpsc::Receiver<ControlNotice>,
    transmitter: Transmitter,
    session: SessionId,
) where
    S: Sink<Message> + Unpin,
{
    while let Some(notice) = outbox.recv().await {
        let text = match notice.to_json() {
            Ok(text) => text,
            Err(err) => {
                warn!(target: "cwsim.control", error = %err, "failed to encode notice");
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            warn!(target: "cwsim.control", session = %session, "notice write failed, closing session");
            transmitter.close(session);
            break;
        }
    }
}

/// 处理一条文本控制消息。
///
/// 解析失败只记录日志；校验失败向本会话回送 `error` 通知。两种情况连接都保持打开。
pub fn handle_control_text(transmitter: &Transmitter, session: SessionId, text: &str) {
    let message = match ControlMessage::parse(text) {
        Ok(message) => message,
        Err(err) => {
            protocol_error(session, &err);
            return;
        }
    };
    debug!(target: "cwsim.control", session = %session, message = ?message, "control message received");

    let result = message
        .into_command()
        .and_then(|command| transmitter.apply(session, command));
    if let Err(err) = result {
        transmitter.reject(session, &err);
    }
}

fn protocol_error(session: SessionId, err: &ProtocolError) {
    record_protocol_error();
    warn!(target: "cwsim.control", session = %session, error = %err, "control message ignored");
}
