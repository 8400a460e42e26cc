//! 타이머 슬롯.
//!
//! 슬롯 하나가 백그라운드 타이머 태스크 하나를 소유한다.
//! `arm`은 항상 기존 태스크를 취소한 뒤 새로 시작하므로 한 슬롯에서
//! 동시에 둘 이상의 타이머가 돌지 않는다.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

/// 슬롯별 시작/취소 누계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// 시작 횟수
    pub starts: u64,
    /// 취소 횟수
    pub cancels: u64,
}

impl TimerStats {
    /// 아직 취소되지 않은 타이머 수 (0 또는 1)
    pub fn outstanding(&self) -> u64 {
        self.starts.saturating_sub(self.cancels)
    }
}

/// 단일 타이머 소유 슬롯
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    stats: TimerStats,
}

impl TimerSlot {
    /// 빈 슬롯
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: None,
            stats: TimerStats::default(),
        }
    }

    /// 타이머 시작 (기존 타이머가 있으면 먼저 취소)
    pub fn arm<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(task));
        self.stats.starts += 1;
        debug!("타이머 시작: {}", self.name);
    }

    /// 타이머 취소: 보유 중인 타이머가 없으면 아무것도 하지 않는다
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                self.stats.cancels += 1;
                debug!("타이머 취소: {}", self.name);
                true
            }
            None => false,
        }
    }

    /// 실행 중인 타이머 보유 여부
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 누계
    pub fn stats(&self) -> TimerStats {
        self.stats
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
