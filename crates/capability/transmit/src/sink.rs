//! 连接发送端抽象。
//!
//! 注册表只持有发送端，不直接持有 socket：实际写入由每个连接自己的任务完成，
//! 广播只做非阻塞入队。

use crate::error::TransportError;
use api_contract::ControlNotice;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// 数据面客户端的帧发送端。
pub trait FrameSink: Send + Sync {
    fn send_frame(&self, frame: Bytes) -> Result<(), TransportError>;
}

/// 控制会话的通知发送端。
pub trait NoticeSink: Send + Sync {
    fn send_notice(&self, notice: ControlNotice) -> Result<(), TransportError>;
}

impl FrameSink for mpsc::Sender<Bytes> {
    fn send_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        self.try_send(frame).map_err(map_try_send)
    }
}

impl NoticeSink for mpsc::Sender<ControlNotice> {
    fn send_notice(&self, notice: ControlNotice) -> Result<(), TransportError> {
        self.try_send(notice).map_err(map_try_send)
    }
}

fn map_try_send<T>(err: TrySendError<T>) -> TransportError {
    match err {
        TrySendError::Full(_) => TransportError::Backpressure,
        TrySendError::Closed(_) => TransportError::Closed,
    }
}
