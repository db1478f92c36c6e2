//! # 重量发送能力模块
//!
//! 把“每分钟 N 次”的发送速率变成带帧格式的字节流，并分发给所有数据面客户端。
//!
//! ## 架构设计
//!
//! ```text
//! 控制会话 startContinuous
//!       │
//!       ▼
//! scheduler（每会话至多一个周期任务）
//!       │ 每次触发
//!       ▼
//! variation（欠重/超重抽样）
//!       │
//!       ▼
//! fanout ── cwsim-protocol::frame ──► registry 中所有数据面客户端
//! ```
//!
//! 单次 `weight` 消息跳过 scheduler，直接成帧广播。
//! 注册表、全局预设与广播共享一把锁（见 [`Transmitter`]）。

mod error;
mod fanout;
mod registry;
mod scheduler;
mod sink;
mod transmitter;
mod variation;

pub use error::TransportError;
pub use fanout::{BroadcastReport, broadcast};
pub use registry::{ClientRegistry, ContinuousJob, ControlSession, DataClient, SessionState};
pub use scheduler::{CancelToken, ScheduledTask, interval_for_rate, schedule};
pub use sink::{FrameSink, NoticeSink};
pub use transmitter::Transmitter;
pub use variation::{vary, vary_with_draw};
