pub mod data;
pub mod validation;

pub use data::{
    ContinuousSpec, ControlCommand, Framing, PresetScope, ProtocolPreset, VariationBand,
    VariationConfig,
};
pub use validation::ValidationError;

use std::fmt;

/// 控制面会话标识（每个 WebSocket 连接一个）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// 数据面客户端标识（每个 TCP 连接一个）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// 任意一类连接的标识，用于统一注销。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionId {
    Control(SessionId),
    Data(ClientId),
}

impl From<SessionId> for ConnectionId {
    fn from(id: SessionId) -> Self {
        Self::Control(id)
    }
}

impl From<ClientId> for ConnectionId {
    fn from(id: ClientId) -> Self {
        Self::Data(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(id) => id.fmt(f),
            Self::Data(id) => id.fmt(f),
        }
    }
}
