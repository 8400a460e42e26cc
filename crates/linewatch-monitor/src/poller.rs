//! 고정 주기 상태 폴러.
//!
//! 시작 즉시 한 번, 이후 매 주기마다 조회 태스크를 띄운다.
//! 이전 조회가 끝나지 않았어도 다음 조회를 띄운다 (중첩 허용).
//! 응답 순서 처리는 호출자 몫이다.

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::timer::{TimerSlot, TimerStats};

/// 최소 폴링 주기
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 상태 폴러
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    slot: TimerSlot,
}

impl Poller {
    /// 폴링 시작
    pub fn start<F, Fut>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        info!("상태 폴링 시작: {}ms 주기", interval.as_millis());

        let mut slot = TimerSlot::new("poll");
        slot.arm(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tokio::spawn(fetch());
            }
        });

        Self { interval, slot }
    }

    /// 폴링 중지 (여러 번 호출해도 안전)
    ///
    /// 이미 띄운 조회 태스크는 취소하지 않는다.
    pub fn stop(&mut self) {
        if self.slot.cancel() {
            debug!("상태 폴링 중지");
        }
    }

    /// 폴링 중 여부
    pub fn is_running(&self) -> bool {
        self.slot.is_armed()
    }

    /// 주기
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 타이머 누계
    pub fn stats(&self) -> TimerStats {
        self.slot.stats()
    }
}
