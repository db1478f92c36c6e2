#![allow(dead_code)]

use api_contract::ControlNotice;
use bytes::Bytes;
use cwsim_transmit::{FrameSink, NoticeSink, TransportError};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// 记录收到的每一帧。
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Bytes>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}

/// 模拟已断开的客户端。
#[derive(Default)]
pub struct BrokenSink {
    pub attempts: Mutex<usize>,
}

impl FrameSink for BrokenSink {
    fn send_frame(&self, _frame: Bytes) -> Result<(), TransportError> {
        *self.attempts.lock().unwrap() += 1;
        Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "broken pipe",
        )))
    }
}

/// 发送队列永远已满的客户端。
pub struct FullSink;

impl FrameSink for FullSink {
    fn send_frame(&self, _frame: Bytes) -> Result<(), TransportError> {
        Err(TransportError::Backpressure)
    }
}

/// 记录控制面通知；`close()` 后模拟会话断开。
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<ControlNotice>>,
    closed: AtomicBool,
}

impl NoticeLog {
    pub fn notices(&self) -> Vec<ControlNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn last_count(&self) -> Option<usize> {
        self.notices().iter().rev().find_map(|notice| match notice {
            ControlNotice::ClientCount { count } => Some(*count),
            _ => None,
        })
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl NoticeSink for NoticeLog {
    fn send_notice(&self, notice: ControlNotice) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}
