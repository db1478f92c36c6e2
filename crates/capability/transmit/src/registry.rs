//! 客户端注册表
//!
//! 独占保存所有控制会话与数据面客户端。调用方只能通过
//! 注册 / 注销 / 遍历 / 计数操作访问，不直接接触底层容器。
//!
//! 数据面客户端的每次增删都会向所有控制会话推送 `clientCount` 通知。

use crate::scheduler::ScheduledTask;
use crate::sink::{FrameSink, NoticeSink};
use api_contract::ControlNotice;
use domain::{ClientId, ConnectionId, ContinuousSpec, ProtocolPreset, SessionId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 运行中的连续发送任务。
#[derive(Debug)]
pub struct ContinuousJob {
    pub spec: ContinuousSpec,
    pub interval: Duration,
    /// 每次启动递增；定时回调用它确认自己仍是当前任务。
    pub generation: u64,
    task: ScheduledTask,
}

impl ContinuousJob {
    pub(crate) fn new(
        spec: ContinuousSpec,
        interval: Duration,
        generation: u64,
        task: ScheduledTask,
    ) -> Self {
        Self {
            spec,
            interval,
            generation,
            task,
        }
    }
}

/// 会话状态：Idle（无定时器）或 Running（恰好一个定时器）。
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running(ContinuousJob),
}

/// 控制面会话。
pub struct ControlSession {
    notices: Arc<dyn NoticeSink>,
    pub preset: ProtocolPreset,
    state: SessionState,
}

impl ControlSession {
    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    pub fn job(&self) -> Option<&ContinuousJob> {
        match &self.state {
            SessionState::Running(job) => Some(job),
            SessionState::Idle => None,
        }
    }

    /// 进入 Running；已有任务先取消（替换语义）。
    pub(crate) fn start(&mut self, job: ContinuousJob) {
        self.stop();
        self.state = SessionState::Running(job);
    }

    /// 回到 Idle。返回之前是否在运行；重复调用无副作用。
    pub fn stop(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            SessionState::Running(job) => {
                job.task.cancel();
                true
            }
            SessionState::Idle => false,
        }
    }

    pub fn notify(&self, notice: ControlNotice) -> Result<(), crate::TransportError> {
        self.notices.send_notice(notice)
    }
}

/// 数据面客户端。
pub struct DataClient {
    sink: Arc<dyn FrameSink>,
    pub peer: String,
}

/// 控制会话与数据面客户端的集合。
#[derive(Default)]
pub struct ClientRegistry {
    next_id: u64,
    sessions: BTreeMap<SessionId, ControlSession>,
    data_clients: BTreeMap<ClientId, DataClient>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_control_session(
        &mut self,
        notices: Arc<dyn NoticeSink>,
        preset: ProtocolPreset,
    ) -> SessionId {
        let id = SessionId(self.allocate_id());
        self.sessions.insert(
            id,
            ControlSession {
                notices,
                preset,
                state: SessionState::Idle,
            },
        );
        info!(target: "cwsim.transmit", session = %id, "control session registered");
        id
    }

    pub fn register_data_client(
        &mut self,
        sink: Arc<dyn FrameSink>,
        peer: impl Into<String>,
    ) -> ClientId {
        let id = ClientId(self.allocate_id());
        let peer = peer.into();
        info!(target: "cwsim.transmit", client = %id, peer = %peer, "data client registered");
        self.data_clients.insert(id, DataClient { sink, peer });
        self.notify_client_count();
        id
    }

    /// 注销任意连接。未知 id 不报错；会话被注销前先停止其定时任务。
    pub fn unregister(&mut self, id: impl Into<ConnectionId>) -> bool {
        match id.into() {
            ConnectionId::Control(id) => match self.sessions.remove(&id) {
                Some(mut session) => {
                    if session.stop() {
                        debug!(target: "cwsim.transmit", session = %id, "continuous job cancelled on close");
                    }
                    info!(target: "cwsim.transmit", session = %id, "control session removed");
                    true
                }
                None => false,
            },
            ConnectionId::Data(id) => match self.data_clients.remove(&id) {
                Some(client) => {
                    info!(target: "cwsim.transmit", client = %id, peer = %client.peer, "data client removed");
                    self.notify_client_count();
                    true
                }
                None => false,
            },
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&ControlSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut ControlSession> {
        self.sessions.get_mut(&id)
    }

    /// 遍历调用时刻的数据面客户端快照。
    pub fn for_each_data_client<F>(&self, mut f: F)
    where
        F: FnMut(ClientId, &dyn FrameSink),
    {
        let snapshot: Vec<(ClientId, Arc<dyn FrameSink>)> = self
            .data_clients
            .iter()
            .map(|(id, client)| (*id, Arc::clone(&client.sink)))
            .collect();
        for (id, sink) in snapshot {
            f(id, sink.as_ref());
        }
    }

    pub fn count_data_clients(&self) -> usize {
        self.data_clients.len()
    }

    pub fn count_control_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// 向所有控制会话推送当前数据面客户端数量；通知发送端已关闭的会话被移除。
    pub fn notify_client_count(&mut self) {
        let notice = ControlNotice::ClientCount {
            count: self.data_clients.len(),
        };
        let mut closed = Vec::new();
        for (id, session) in &self.sessions {
            if let Err(err) = session.notify(notice.clone()) {
                if err.is_fatal() {
                    warn!(target: "cwsim.transmit", session = %id, error = %err, "client count notice failed");
                    closed.push(*id);
                } else {
                    debug!(target: "cwsim.transmit", session = %id, "client count notice dropped");
                }
            }
        }
        for id in closed {
            self.unregister(id);
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
