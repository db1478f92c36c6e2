mod common;

use api_contract::ControlNotice;
use common::{NoticeLog, RecordingSink};
use cwsim_transmit::Transmitter;
use domain::{
    ContinuousSpec, ControlCommand, Framing, PresetScope, ProtocolPreset, ValidationError,
};
use std::sync::Arc;

fn setup(scope: PresetScope) -> (Transmitter, Arc<RecordingSink>) {
    let transmitter = Transmitter::with_seed(scope, ProtocolPreset::crlf(), 3);
    let sink = Arc::new(RecordingSink::default());
    transmitter.open_data_client(sink.clone(), "127.0.0.1:50001");
    (transmitter, sink)
}

fn send(weight: &str) -> ControlCommand {
    ControlCommand::SendWeight {
        weight: weight.to_string(),
        framing: Framing::Active,
    }
}

#[test]
fn one_shot_uses_default_preset() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    transmitter.apply(session, send("1234")).expect("apply");
    assert_eq!(&sink.frames()[0][..], b"1234\r\n");
}

#[test]
fn session_scope_keeps_presets_separate() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let first = transmitter.open_control_session(Arc::new(NoticeLog::default()));
    let second = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    transmitter
        .apply(first, ControlCommand::SelectPreset(ProtocolPreset::stx_etx()))
        .expect("settings");
    transmitter.apply(first, send("1")).expect("first");
    transmitter.apply(second, send("2")).expect("second");

    let frames = sink.frames();
    assert_eq!(&frames[0][..], b"\x021\x03");
    assert_eq!(&frames[1][..], b"2\r\n");
    assert_eq!(
        transmitter.active_preset(second),
        Some(ProtocolPreset::crlf())
    );
}

#[test]
fn global_scope_shares_preset() {
    let (transmitter, sink) = setup(PresetScope::Global);
    let first = transmitter.open_control_session(Arc::new(NoticeLog::default()));
    let second = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    transmitter
        .apply(first, ControlCommand::SelectPreset(ProtocolPreset::stx_etx()))
        .expect("settings");
    transmitter.apply(second, send("2")).expect("second");

    assert_eq!(&sink.frames()[0][..], b"\x022\x03");
    assert_eq!(
        transmitter.active_preset(second),
        Some(ProtocolPreset::stx_etx())
    );
}

#[test]
fn custom_framing_overrides_active_preset() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    transmitter
        .apply(
            session,
            ControlCommand::SendWeight {
                weight: "250".to_string(),
                framing: Framing::Custom {
                    prefix: "\\x01".to_string(),
                    suffix: "\\x04".to_string(),
                },
            },
        )
        .expect("apply");
    transmitter.apply(session, send("251")).expect("apply");

    let frames = sink.frames();
    assert_eq!(&frames[0][..], b"\x01250\x04");
    assert_eq!(&frames[1][..], b"251\r\n");
}

#[test]
fn empty_weight_frames_prefix_and_suffix_only() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));
    transmitter.select_preset(session, ProtocolPreset::stx_etx());

    transmitter.send_weight(session, "", &Framing::Active);
    assert_eq!(&sink.frames()[0][..], &[0x02, 0x03]);
}

#[test]
fn commands_from_closed_session_are_ignored() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));
    transmitter.close(session);

    transmitter.apply(session, send("1")).expect("apply");
    assert_eq!(sink.len(), 0);
    assert_eq!(transmitter.active_preset(session), None);
}

#[tokio::test]
async fn apply_rejects_invalid_rate() {
    let (transmitter, _sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    let err = transmitter
        .apply(
            session,
            ControlCommand::StartContinuous(ContinuousSpec {
                base_weight: 1,
                weights_per_minute: 0,
                variation: None,
            }),
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidRate(_)));
    assert!(!transmitter.is_running(session));
}

#[tokio::test]
async fn apply_start_then_stop() {
    let (transmitter, _sink) = setup(PresetScope::Session);
    let session = transmitter.open_control_session(Arc::new(NoticeLog::default()));

    transmitter
        .apply(
            session,
            ControlCommand::StartContinuous(ContinuousSpec {
                base_weight: 1,
                weights_per_minute: 60,
                variation: None,
            }),
        )
        .expect("start");
    assert!(transmitter.is_running(session));
    transmitter
        .apply(session, ControlCommand::StopContinuous)
        .expect("stop");
    transmitter
        .apply(session, ControlCommand::StopContinuous)
        .expect("stop again");
    assert!(!transmitter.is_running(session));
}

#[test]
fn rejection_is_sent_only_to_originating_session() {
    let (transmitter, sink) = setup(PresetScope::Session);
    let origin = Arc::new(NoticeLog::default());
    let bystander = Arc::new(NoticeLog::default());
    let session = transmitter.open_control_session(origin.clone());
    transmitter.open_control_session(bystander.clone());

    transmitter.reject(session, &ValidationError::EmptyVariation);

    assert!(
        origin
            .notices()
            .iter()
            .any(|notice| matches!(notice, ControlNotice::Error { .. }))
    );
    assert!(
        !bystander
            .notices()
            .iter()
            .any(|notice| matches!(notice, ControlNotice::Error { .. }))
    );
    assert_eq!(sink.len(), 0);
}
