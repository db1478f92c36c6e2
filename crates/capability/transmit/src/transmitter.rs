//! 发送引擎门面
//!
//! 所有注册表变更、预设读写和广播都在同一把锁内完成，作为每次触发的唯一顺序点。
//! 锁内只做非阻塞操作（入队、取消任务），不等待任何客户端。

use crate::fanout::{BroadcastReport, broadcast};
use crate::registry::{ClientRegistry, ContinuousJob};
use crate::scheduler::{interval_for_rate, schedule};
use crate::sink::{FrameSink, NoticeSink};
use crate::variation::vary;
use api_contract::ControlNotice;
use cwsim_protocol::custom_preset;
use cwsim_telemetry::{
    record_control_session_opened, record_data_client_opened, record_tick,
    record_validation_rejected,
};
use domain::{
    ClientId, ConnectionId, ContinuousSpec, ControlCommand, Framing, PresetScope, ProtocolPreset,
    SessionId, ValidationError,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

struct State {
    registry: ClientRegistry,
    /// `PresetScope::Global` 时所有广播使用的预设。
    global_preset: ProtocolPreset,
    next_generation: u64,
    rng: StdRng,
}

struct Shared {
    state: Mutex<State>,
    scope: PresetScope,
    default_preset: ProtocolPreset,
}

/// 发送引擎句柄，可廉价克隆并在各连接任务间共享。
#[derive(Clone)]
pub struct Transmitter {
    shared: Arc<Shared>,
}

impl Transmitter {
    pub fn new(scope: PresetScope, default_preset: ProtocolPreset) -> Self {
        Self::with_rng(scope, default_preset, StdRng::from_entropy())
    }

    /// 固定随机种子（用于测试复现）。
    pub fn with_seed(scope: PresetScope, default_preset: ProtocolPreset, seed: u64) -> Self {
        Self::with_rng(scope, default_preset, StdRng::seed_from_u64(seed))
    }

    fn with_rng(scope: PresetScope, default_preset: ProtocolPreset, rng: StdRng) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    registry: ClientRegistry::new(),
                    global_preset: default_preset.clone(),
                    next_generation: 0,
                    rng,
                }),
                scope,
                default_preset,
            }),
        }
    }

    pub fn scope(&self) -> PresetScope {
        self.shared.scope
    }

    /// 注册控制会话，并立即推送当前数据面客户端数量。
    pub fn open_control_session(&self, notices: Arc<dyn NoticeSink>) -> SessionId {
        let mut state = self.shared.lock();
        let id = state
            .registry
            .register_control_session(notices, self.shared.default_preset.clone());
        record_control_session_opened();
        let count = state.registry.count_data_clients();
        let sent = state
            .registry
            .session(id)
            .map(|session| session.notify(ControlNotice::ClientCount { count }));
        if let Some(Err(err)) = sent
            && err.is_fatal()
        {
            state.registry.unregister(id);
        }
        id
    }

    pub fn open_data_client(&self, sink: Arc<dyn FrameSink>, peer: &str) -> ClientId {
        let id = self.shared.lock().registry.register_data_client(sink, peer);
        record_data_client_opened();
        id
    }

    /// 关闭连接。重复关闭或关闭未知连接无副作用。
    pub fn close(&self, id: impl Into<ConnectionId>) -> bool {
        self.shared.lock().registry.unregister(id)
    }

    /// 执行已校验的控制指令。
    pub fn apply(&self, session: SessionId, command: ControlCommand) -> Result<(), ValidationError> {
        match command {
            ControlCommand::SendWeight { weight, framing } => {
                self.send_weight(session, &weight, &framing);
            }
            ControlCommand::SelectPreset(preset) => self.select_preset(session, preset),
            ControlCommand::StartContinuous(spec) => {
                self.start_continuous(session, spec)?;
            }
            ControlCommand::StopContinuous => {
                self.stop_continuous(session);
            }
        }
        Ok(())
    }

    /// 将校验错误回送给发起请求的会话。
    pub fn reject(&self, session: SessionId, err: &ValidationError) {
        record_validation_rejected();
        warn!(target: "cwsim.transmit", session = %session, error = %err, "control message rejected");
        self.notify(session, ControlNotice::rejected(err));
    }

    /// 向单个会话推送通知；发送端已关闭则移除该会话。
    pub fn notify(&self, session: SessionId, notice: ControlNotice) {
        let mut state = self.shared.lock();
        let Some(sent) = state
            .registry
            .session(session)
            .map(|target| target.notify(notice))
        else {
            return;
        };
        if let Err(err) = sent
            && err.is_fatal()
        {
            warn!(target: "cwsim.transmit", session = %session, error = %err, "notice delivery failed");
            state.registry.unregister(session);
        }
    }

    /// 单次广播，不经过定时器。
    pub fn send_weight(&self, session: SessionId, weight: &str, framing: &Framing) -> BroadcastReport {
        let mut state = self.shared.lock();
        let preset = match framing {
            Framing::Active => match self.shared.active_preset(&state, session) {
                Some(preset) => preset,
                None => return BroadcastReport::default(),
            },
            Framing::Custom { prefix, suffix } => custom_preset(prefix, suffix),
        };
        let report = broadcast(&mut state.registry, weight, &preset);
        info!(
            target: "cwsim.transmit",
            session = %session,
            weight = %weight,
            delivered = report.delivered,
            "one-shot weight sent"
        );
        report
    }

    /// 切换预设，从下一帧开始生效。
    pub fn select_preset(&self, session: SessionId, preset: ProtocolPreset) {
        let mut state = self.shared.lock();
        let state = &mut *state;
        let Some(target) = state.registry.session_mut(session) else {
            return;
        };
        info!(target: "cwsim.transmit", session = %session, preset = %preset.name, "updated control chars");
        match self.shared.scope {
            PresetScope::Session => target.preset = preset,
            PresetScope::Global => state.global_preset = preset,
        }
    }

    /// 启动（或替换）该会话的连续发送，返回触发间隔。
    pub fn start_continuous(
        &self,
        session: SessionId,
        spec: ContinuousSpec,
    ) -> Result<Duration, ValidationError> {
        let interval = interval_for_rate(spec.weights_per_minute)?;
        let mut state = self.shared.lock();
        let state = &mut *state;
        let Some(target) = state.registry.session_mut(session) else {
            debug!(target: "cwsim.transmit", session = %session, "start ignored for closed session");
            return Ok(interval);
        };

        state.next_generation += 1;
        let generation = state.next_generation;
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let task = schedule(interval, move || {
            if let Some(shared) = weak.upgrade() {
                shared.run_tick(session, generation);
            }
        });

        info!(
            target: "cwsim.transmit",
            session = %session,
            base_weight = spec.base_weight,
            weights_per_minute = spec.weights_per_minute,
            interval_ms = interval.as_millis() as u64,
            varied = spec.variation.is_some(),
            "continuous transmission started"
        );
        target.start(ContinuousJob::new(spec, interval, generation, task));
        Ok(interval)
    }

    /// 停止该会话的连续发送。返回之前是否在运行；重复调用无副作用。
    pub fn stop_continuous(&self, session: SessionId) -> bool {
        let mut state = self.shared.lock();
        let stopped = state
            .registry
            .session_mut(session)
            .is_some_and(|target| target.stop());
        if stopped {
            info!(target: "cwsim.transmit", session = %session, "continuous transmission stopped");
        }
        stopped
    }

    pub fn is_running(&self, session: SessionId) -> bool {
        self.shared
            .lock()
            .registry
            .session(session)
            .is_some_and(|target| target.is_running())
    }

    /// 当前对该会话生效的预设；会话不存在返回 `None`。
    pub fn active_preset(&self, session: SessionId) -> Option<ProtocolPreset> {
        let state = self.shared.lock();
        self.shared.active_preset(&state, session)
    }

    pub fn data_client_count(&self) -> usize {
        self.shared.lock().registry.count_data_clients()
    }

    pub fn control_session_count(&self) -> usize {
        self.shared.lock().registry.count_control_sessions()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // 受保护的操作都是幂等的，锁中毒时继续使用内部状态。
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_preset(&self, state: &State, session: SessionId) -> Option<ProtocolPreset> {
        let target = state.registry.session(session)?;
        Some(match self.scope {
            PresetScope::Session => target.preset.clone(),
            PresetScope::Global => state.global_preset.clone(),
        })
    }

    /// 定时回调：在锁内确认任务仍有效，再抽样、成帧、广播。
    fn run_tick(&self, session: SessionId, generation: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(job) = state
            .registry
            .session(session)
            .and_then(|target| target.job())
        else {
            return;
        };
        if job.generation != generation {
            return;
        }
        let (base_weight, variation) = (job.spec.base_weight, job.spec.variation);
        let Some(preset) = self.active_preset(state, session) else {
            return;
        };

        record_tick();
        let weight = vary(base_weight, variation.as_ref(), &mut state.rng);
        let report = broadcast(&mut state.registry, &weight.to_string(), &preset);
        debug!(
            target: "cwsim.transmit",
            session = %session,
            weight,
            delivered = report.delivered,
            "tick"
        );
    }
}
