//! 상태 샘플 → 표시값 파생.
//!
//! 최신 샘플만 보관하고, 정지 중일 때는 1초 티커가 정지 경과 시간을 갱신한다.
//! 티커의 시작/취소는 효과로 반환되며 항상 1:1로 짝지어진다.

use chrono::{DateTime, Utc};

use crate::models::machine::StatusSample;

/// 정지 티커 효과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerEffect {
    /// 티커 시작
    Start,
    /// 실행 중인 티커 취소
    Cancel,
}

/// 최신 샘플 기반 파생 상태
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    latest: Option<StatusSample>,
    ticker_active: bool,
    elapsed_stopped_secs: u64,
}

impl StatusTracker {
    /// 빈 추적기
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 샘플 반영 (마지막 도착 우선)
    ///
    /// 기존 티커가 있으면 먼저 취소하고, 정지 샘플이면 새로 시작한다.
    pub fn apply(&mut self, sample: StatusSample, now: DateTime<Utc>) -> Vec<TickerEffect> {
        let mut effects = Vec::with_capacity(2);
        if self.ticker_active {
            effects.push(TickerEffect::Cancel);
            self.ticker_active = false;
        }

        if sample.is_running {
            self.elapsed_stopped_secs = 0;
        } else {
            self.elapsed_stopped_secs = elapsed_secs(sample.since_time, now);
            effects.push(TickerEffect::Start);
            self.ticker_active = true;
        }

        self.latest = Some(sample);
        effects
    }

    /// 티커 한 번: 정지 경과 시간 재계산
    pub fn tick(&mut self, now: DateTime<Utc>) -> u64 {
        if let Some(sample) = self.latest.filter(|s| !s.is_running) {
            self.elapsed_stopped_secs = elapsed_secs(sample.since_time, now);
        }
        self.elapsed_stopped_secs
    }

    /// 종료: 실행 중인 티커가 있으면 취소
    pub fn teardown(&mut self) -> Vec<TickerEffect> {
        if std::mem::take(&mut self.ticker_active) {
            vec![TickerEffect::Cancel]
        } else {
            Vec::new()
        }
    }

    /// 최신 샘플
    pub fn latest(&self) -> Option<&StatusSample> {
        self.latest.as_ref()
    }

    /// 가동 여부 (샘플 없으면 None)
    pub fn is_running(&self) -> Option<bool> {
        self.latest.map(|s| s.is_running)
    }

    /// 정지 경과 시간 (초), 가동 중이면 0
    pub fn elapsed_stopped_secs(&self) -> u64 {
        self.elapsed_stopped_secs
    }

    /// 정지 시작 시각 (정지 중일 때만)
    pub fn stopped_since(&self) -> Option<DateTime<Utc>> {
        self.latest
            .filter(|s| !s.is_running)
            .map(|s| s.since_time)
    }

    /// 생산 시작 시각 (가동 중일 때만)
    pub fn producing_since(&self) -> Option<DateTime<Utc>> {
        self.latest.filter(|s| s.is_running).map(|s| s.since_time)
    }

    /// 티커 실행 여부
    pub fn ticker_active(&self) -> bool {
        self.ticker_active
    }
}

fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - since).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn sample(is_running: bool, since: DateTime<Utc>) -> StatusSample {
        StatusSample {
            is_running,
            sample_time: since,
            since_time: since,
        }
    }

    #[test]
    fn stopped_then_running_scenario() {
        let mut tracker = StatusTracker::new();

        let effects = tracker.apply(sample(false, t0()), t0());
        assert_eq!(effects, vec![TickerEffect::Start]);
        assert_eq!(tracker.stopped_since(), Some(t0()));
        assert_eq!(tracker.producing_since(), None);

        // T0+5s, 두 번째 폴링 도착 직전
        for s in 1..=5 {
            tracker.tick(t0() + Duration::seconds(s));
        }
        assert_eq!(tracker.elapsed_stopped_secs(), 5);

        // 가동 샘플 도착 직후
        let t5 = t0() + Duration::seconds(5);
        let effects = tracker.apply(sample(true, t5), t5);
        assert_eq!(effects, vec![TickerEffect::Cancel]);
        assert_eq!(tracker.elapsed_stopped_secs(), 0);
        assert_eq!(tracker.producing_since(), Some(t5));
        assert_eq!(tracker.stopped_since(), None);
    }

    #[test]
    fn ticker_effects_always_pair() {
        let mut tracker = StatusTracker::new();
        let mut active: i32 = 0;
        let mut starts = 0;
        let mut cancels = 0;

        let pattern = [false, false, true, true, false, true, false, false, false, true];
        for (i, running) in pattern.iter().enumerate() {
            let now = t0() + Duration::seconds(i as i64 * 10);
            for effect in tracker.apply(sample(*running, now), now) {
                match effect {
                    TickerEffect::Start => {
                        starts += 1;
                        active += 1;
                    }
                    TickerEffect::Cancel => {
                        assert!(active > 0, "실행 중이 아닌 티커 취소");
                        cancels += 1;
                        active -= 1;
                    }
                }
                assert!(active <= 1, "티커 동시 실행");
            }
            assert_eq!(tracker.ticker_active(), active == 1);
        }

        for effect in tracker.teardown() {
            assert_eq!(effect, TickerEffect::Cancel);
            cancels += 1;
        }
        assert_eq!(starts, cancels);
        assert!(tracker.teardown().is_empty());
    }

    #[test]
    fn running_sample_without_ticker_has_no_effects() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.apply(sample(true, t0()), t0()).is_empty());
        assert!(tracker.teardown().is_empty());
    }

    #[test]
    fn tick_while_running_keeps_zero() {
        let mut tracker = StatusTracker::new();
        tracker.apply(sample(true, t0()), t0());
        assert_eq!(tracker.tick(t0() + Duration::seconds(30)), 0);
    }

    #[test]
    fn future_stop_time_saturates_to_zero() {
        let mut tracker = StatusTracker::new();
        tracker.apply(sample(false, t0() + Duration::seconds(60)), t0());
        assert_eq!(tracker.elapsed_stopped_secs(), 0);
    }

    #[test]
    fn last_applied_sample_wins() {
        let mut tracker = StatusTracker::new();
        let late = t0() + Duration::seconds(10);
        tracker.apply(sample(true, late), late);
        // 먼저 요청됐지만 늦게 도착한 응답
        tracker.apply(sample(false, t0()), late);
        assert_eq!(tracker.is_running(), Some(false));
        assert_eq!(tracker.elapsed_stopped_secs(), 10);
    }
}
