//! 传输错误类型定义

/// 单个连接的发送错误。只影响该连接本身。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 对端已断开（发送队列的接收端已关闭）
    #[error("connection closed")]
    Closed,

    /// 发送队列已满，本帧被丢弃
    #[error("send queue full")]
    Backpressure,

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 写超时
    #[error("write timed out")]
    Timeout,
}

impl TransportError {
    /// 是否需要将该连接从注册表移除。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Backpressure)
    }
}
