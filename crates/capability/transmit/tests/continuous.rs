mod common;

use common::{NoticeLog, RecordingSink};
use cwsim_transmit::Transmitter;
use domain::{ContinuousSpec, PresetScope, ProtocolPreset, VariationBand, VariationConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn spec(base_weight: u64, weights_per_minute: u32) -> ContinuousSpec {
    ContinuousSpec {
        base_weight,
        weights_per_minute,
        variation: None,
    }
}

fn setup(scope: PresetScope) -> (Transmitter, Arc<NoticeLog>, Arc<RecordingSink>) {
    let transmitter = Transmitter::with_seed(scope, ProtocolPreset::crlf(), 7);
    let notices = Arc::new(NoticeLog::default());
    let sink = Arc::new(RecordingSink::default());
    transmitter.open_data_client(sink.clone(), "127.0.0.1:50000");
    (transmitter, notices, sink)
}

#[tokio::test(start_paused = true)]
async fn ticks_at_configured_rate() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    let interval = transmitter
        .start_continuous(session, spec(100, 600))
        .expect("start");
    assert_eq!(interval, Duration::from_millis(100));
    assert!(transmitter.is_running(session));

    sleep(Duration::from_millis(1_050)).await;
    let frames = sink.frames();
    assert_eq!(frames.len(), 10);
    assert!(frames.iter().all(|frame| &frame[..] == b"100\r\n"));
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_one_interval() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(session, spec(5, 60))
        .expect("start");
    sleep(Duration::from_millis(999)).await;
    assert_eq!(sink.len(), 0);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(sink.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_existing_timer() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(session, spec(100, 600))
        .expect("start");
    sleep(Duration::from_millis(350)).await;
    assert_eq!(sink.len(), 3);

    transmitter
        .start_continuous(session, spec(200, 600))
        .expect("restart");
    sleep(Duration::from_millis(1_020)).await;

    // 重启后只剩一个定时器：350ms 之后 10 次触发，全部使用新重量。
    let frames = sink.frames();
    assert_eq!(frames.len(), 13);
    assert!(frames[3..].iter().all(|frame| &frame[..] == b"200\r\n"));
}

#[tokio::test(start_paused = true)]
async fn stop_is_immediate_and_idempotent() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(session, spec(100, 600))
        .expect("start");
    sleep(Duration::from_millis(250)).await;
    assert!(transmitter.stop_continuous(session));
    assert!(!transmitter.stop_continuous(session));
    assert!(!transmitter.is_running(session));

    let delivered = sink.len();
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.len(), delivered);
}

#[tokio::test(start_paused = true)]
async fn closing_session_cancels_its_timer() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(session, spec(100, 600))
        .expect("start");
    sleep(Duration::from_millis(150)).await;
    assert!(transmitter.close(session));
    assert!(!transmitter.close(session));

    let delivered = sink.len();
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.len(), delivered);
    assert!(!transmitter.is_running(session));
}

#[tokio::test(start_paused = true)]
async fn start_on_closed_session_schedules_nothing() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);
    transmitter.close(session);

    transmitter
        .start_continuous(session, spec(100, 600))
        .expect("rate is valid");
    sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_rate_leaves_session_idle() {
    let (transmitter, notices, _sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    assert!(transmitter.start_continuous(session, spec(100, 0)).is_err());
    assert!(transmitter.start_continuous(session, spec(100, 601)).is_err());
    assert!(!transmitter.is_running(session));
}

#[tokio::test(start_paused = true)]
async fn sessions_tick_independently() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let first = transmitter.open_control_session(notices.clone());
    let second = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(first, spec(1, 600))
        .expect("start first");
    transmitter
        .start_continuous(second, spec(2, 300))
        .expect("start second");
    sleep(Duration::from_millis(1_050)).await;

    let frames = sink.frames();
    let ones = frames.iter().filter(|frame| &frame[..] == b"1\r\n").count();
    let twos = frames.iter().filter(|frame| &frame[..] == b"2\r\n").count();
    assert_eq!(ones, 10);
    assert_eq!(twos, 5);

    transmitter.stop_continuous(first);
    assert!(transmitter.is_running(second));
}

#[tokio::test(start_paused = true)]
async fn ticks_apply_variation() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    let variation = VariationConfig {
        underweight: Some(VariationBand {
            frequency: 1.0,
            amount: 0.5,
        }),
        overweight: None,
    };
    transmitter
        .start_continuous(
            session,
            ContinuousSpec {
                base_weight: 100,
                weights_per_minute: 600,
                variation: Some(variation),
            },
        )
        .expect("start");
    sleep(Duration::from_millis(550)).await;

    let frames = sink.frames();
    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|frame| &frame[..] == b"50\r\n"));
}

#[tokio::test(start_paused = true)]
async fn preset_change_applies_from_next_tick() {
    let (transmitter, notices, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(notices);

    transmitter
        .start_continuous(session, spec(42, 600))
        .expect("start");
    sleep(Duration::from_millis(250)).await;
    transmitter.select_preset(session, ProtocolPreset::stx_etx());
    sleep(Duration::from_millis(200)).await;

    let frames = sink.frames();
    assert_eq!(frames.len(), 4);
    assert_eq!(&frames[0][..], b"42\r\n");
    assert_eq!(&frames[1][..], b"42\r\n");
    assert_eq!(&frames[2][..], b"\x0242\x03");
    assert_eq!(&frames[3][..], b"\x0242\x03");
}
