//! 可取消的周期任务。
//!
//! `schedule` 返回 `ScheduledTask`；`cancel` 或 drop 之后不会再触发回调。
//! 回调本身也应在共享锁内复核自己是否仍然有效，见 `Transmitter` 的 generation 校验。

use domain::ValidationError;
use domain::validation::{MAX_WEIGHTS_PER_MINUTE, MIN_WEIGHTS_PER_MINUTE};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const MILLIS_PER_MINUTE: u64 = 60_000;

/// `floor(60000 / weights_per_minute)` 毫秒。
pub fn interval_for_rate(weights_per_minute: u32) -> Result<Duration, ValidationError> {
    if !(MIN_WEIGHTS_PER_MINUTE..=MAX_WEIGHTS_PER_MINUTE).contains(&weights_per_minute) {
        return Err(ValidationError::InvalidRate(weights_per_minute.to_string()));
    }
    Ok(Duration::from_millis(
        MILLIS_PER_MINUTE / u64::from(weights_per_minute),
    ))
}

/// 取消标记。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 正在运行的周期任务句柄。
#[derive(Debug)]
pub struct ScheduledTask {
    token: CancelToken,
    handle: JoinHandle<()>,
    period: Duration,
}

impl ScheduledTask {
    pub fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 每隔 `period` 调用一次 `tick`，首次触发在一个周期之后。
///
/// 必须在 tokio 运行时内调用。运行时卡顿导致的错过触发直接跳过，不补发。
pub fn schedule<F>(period: Duration, mut tick: F) -> ScheduledTask
where
    F: FnMut() + Send + 'static,
{
    let token = CancelToken::new();
    let guard = token.clone();
    let start = Instant::now() + period;
    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if guard.is_cancelled() {
                break;
            }
            tick();
        }
    });
    ScheduledTask {
        token,
        handle,
        period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_interval_for_rate() {
        assert_eq!(interval_for_rate(600).unwrap(), Duration::from_millis(100));
        assert_eq!(interval_for_rate(1).unwrap(), Duration::from_millis(60_000));
        assert_eq!(interval_for_rate(7).unwrap(), Duration::from_millis(8_571));
        assert!(interval_for_rate(0).is_err());
        assert!(interval_for_rate(601).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task = schedule(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel();
        assert!(task.is_cancelled());
        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task = schedule(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(task);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
