//! # 上传进度
//!
//! ## 设计思路
//!
//! 请求体按块交给传输层，每交出一块就累加“已发送字节”。进度回调可能在运行时的
//! 工作线程上触发，调用方若要更新界面状态需自行切回界面线程。
//!
//! ## 实现思路
//!
//! - 节流：比例变化不足 1% 不回调，100% 一定回调一次。
//! - 回调在锁内触发，保证多线程下回调值单调不减。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;

const PROGRESS_MIN_PERCENT_DELTA: u8 = 1;

#[derive(Debug, Default)]
struct ProgressThrottleState {
    last_percent: Option<u8>,
    last_fraction: f64,
    finished: bool,
}

fn should_emit_progress(state: &ProgressThrottleState, percent: u8, fraction: f64) -> bool {
    if state.finished {
        return false;
    }

    if fraction >= 1.0 {
        return true;
    }

    match state.last_percent {
        None => true,
        Some(last) => percent.saturating_sub(last) >= PROGRESS_MIN_PERCENT_DELTA,
    }
}

/// 进度上报器：记录已发送字节并按节流规则回调。
pub struct ProgressReporter {
    total: u64,
    sent: AtomicU64,
    throttle: Mutex<ProgressThrottleState>,
    callback: Box<dyn Fn(f64) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new<F>(total: u64, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            total,
            sent: AtomicU64::new(0),
            throttle: Mutex::new(ProgressThrottleState::default()),
            callback: Box::new(callback),
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    /// 记录新交出的字节数。
    pub fn advance(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::SeqCst).saturating_add(bytes);
        let fraction = if self.total == 0 {
            1.0
        } else {
            (sent as f64 / self.total as f64).min(1.0)
        };
        self.emit(fraction);
    }

    /// 请求体已全部发出（空请求体也会得到一次 1.0）。
    pub fn finish(&self) {
        self.emit(1.0);
    }

    fn emit(&self, fraction: f64) {
        let Ok(mut state) = self.throttle.lock() else {
            return;
        };

        let fraction = fraction.clamp(0.0, 1.0).max(state.last_fraction);
        let percent = (fraction * 100.0).floor() as u8;
        if !should_emit_progress(&state, percent, fraction) {
            return;
        }

        state.last_percent = Some(percent);
        state.last_fraction = fraction;
        state.finished = fraction >= 1.0;
        (self.callback)(fraction);
    }
}

/// 把字节切块包装成流式请求体，每交出一块上报一次进度。
pub fn progress_body(
    bytes: Bytes,
    chunk_size: usize,
    reporter: Arc<ProgressReporter>,
) -> reqwest::Body {
    let chunk_size = chunk_size.max(1);
    let len = bytes.len();
    let chunks = (0..len)
        .step_by(chunk_size)
        .map(move |start| bytes.slice(start..(start + chunk_size).min(len)));

    let stream = futures::stream::iter(chunks).map(move |chunk| {
        reporter.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}
