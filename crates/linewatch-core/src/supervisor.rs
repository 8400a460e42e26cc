//! 라이브 피드 재연결 상태 머신.
//!
//! 소켓 바인딩과 무관한 순수 전이 함수 `(상태, 이벤트) → (상태, 효과)`.
//! 실제 연결/타이머 실행은 드라이버(`linewatch-monitor::feed`)가 효과를 보고 수행한다.
//!
//! ```text
//! Disconnected ──Start──▶ Connecting ──Opened──▶ Open
//!                             │                   │
//!                       Closed/Errored      Closed/Errored
//!                             ▼                   ▼
//!                  ┌──── ClosedRetrying ◀─────────┘   (실패 < max)
//!                  │          │
//!           TimerFired        └──▶ PermanentlyFailed   (실패 == max)
//!                  ▼
//!             Connecting
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 기본 연속 실패 허용 횟수
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// 기본 재연결 대기 시간
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3_000);

/// 피드 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// 연결 없음 (시작 전 또는 종료 후)
    Disconnected,
    /// 연결 시도 중
    Connecting,
    /// 연결됨
    Open,
    /// 끊김, 재연결 대기 중
    ClosedRetrying,
    /// 재시도 한도 소진 (수동 재시작 필요)
    PermanentlyFailed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::ClosedRetrying => write!(f, "ClosedRetrying"),
            ConnectionState::PermanentlyFailed => write!(f, "PermanentlyFailed"),
        }
    }
}

/// 상태 머신 입력
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// 시작 (마운트)
    Start,
    /// 연결 + 핸드셰이크 성공
    Opened,
    /// 연결 종료
    Closed,
    /// 연결 에러
    Errored(String),
    /// 재연결 타이머 만료: 예약 당시의 실패 횟수로 태깅
    TimerFired { attempt: u32 },
    /// 종료 (언마운트)
    Teardown,
}

/// 드라이버가 수행할 효과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEffect {
    /// 새 연결 시도
    Connect,
    /// 재연결 타이머 예약
    ScheduleRetry { attempt: u32, delay: Duration },
    /// 대기 중인 재연결 타이머 취소
    CancelRetry,
    /// 현재 연결 닫기
    CloseSocket,
    /// 영구 실패 통지 (한 번만)
    NotifyTerminal,
}

/// 재연결 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// 연속 실패 허용 횟수 (최소 1)
    pub max_attempts: u32,
    /// 고정 재연결 대기 시간
    pub retry_delay: Duration,
}

impl ReconnectPolicy {
    /// 새 정책: `max_attempts`는 1 미만이면 1로 보정
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// 재연결 감독자: 순수 상태 머신
///
/// `attempts`는 마지막 성공 연결 이후의 연속 실패 횟수다.
/// 연결이 열리면 0으로 리셋되므로 지속적인 연결은 항상 새 재시도 예산을 얻는다.
#[derive(Debug, Clone)]
pub struct ReconnectSupervisor {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
}

impl ReconnectSupervisor {
    /// 새 감독자 (Disconnected)
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 연속 실패 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 정책
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// 이벤트 처리 → 수행할 효과 목록
    ///
    /// 현재 상태에서 의미 없는 이벤트(늦게 도착한 타이머, 이미 닫힌 연결의
    /// 중복 종료 등)는 무시하고 빈 목록을 반환한다.
    pub fn handle(&mut self, event: FeedEvent) -> Vec<FeedEffect> {
        use ConnectionState::*;

        match (self.state, event) {
            (current, FeedEvent::Teardown) => {
                self.state = Disconnected;
                match current {
                    Connecting | Open => vec![FeedEffect::CloseSocket],
                    ClosedRetrying => vec![FeedEffect::CancelRetry],
                    Disconnected | PermanentlyFailed => Vec::new(),
                }
            }
            (Disconnected | PermanentlyFailed, FeedEvent::Start) => {
                self.attempts = 0;
                self.state = Connecting;
                vec![FeedEffect::Connect]
            }
            (Connecting, FeedEvent::Opened) => {
                if self.attempts > 0 {
                    info!("피드 재연결 성공 ({}회 실패 후)", self.attempts);
                }
                self.attempts = 0;
                self.state = Open;
                Vec::new()
            }
            (Connecting | Open, event @ (FeedEvent::Closed | FeedEvent::Errored(_))) => {
                self.attempts += 1;
                if let FeedEvent::Errored(reason) = &event {
                    warn!("피드 연결 에러: {reason}");
                }

                if self.attempts >= self.policy.max_attempts {
                    warn!(
                        "피드 재연결 한도 도달 ({}/{}), 재시도 중단",
                        self.attempts, self.policy.max_attempts
                    );
                    self.state = PermanentlyFailed;
                    vec![FeedEffect::NotifyTerminal]
                } else {
                    debug!(
                        "피드 연결 끊김 ({}/{}), {:?} 후 재연결",
                        self.attempts, self.policy.max_attempts, self.policy.retry_delay
                    );
                    self.state = ClosedRetrying;
                    vec![FeedEffect::ScheduleRetry {
                        attempt: self.attempts,
                        delay: self.policy.retry_delay,
                    }]
                }
            }
            (ClosedRetrying, FeedEvent::TimerFired { attempt }) if attempt == self.attempts => {
                self.state = Connecting;
                vec![FeedEffect::Connect]
            }
            (state, event) => {
                debug!("무시된 피드 이벤트: {event:?} (상태 {state})");
                Vec::new()
            }
        }
    }
}

impl Default for ReconnectSupervisor {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(max: u32) -> ReconnectSupervisor {
        ReconnectSupervisor::new(ReconnectPolicy::new(max, Duration::from_secs(3)))
    }

    /// 실패 → 타이머 만료를 반복하며 Connect 효과 수를 센다
    fn fail_until_terminal(sup: &mut ReconnectSupervisor, connects: &mut u32) {
        loop {
            let effects = sup.handle(FeedEvent::Errored("refused".to_string()));
            match effects.as_slice() {
                [FeedEffect::ScheduleRetry { attempt, .. }] => {
                    let attempt = *attempt;
                    let effects = sup.handle(FeedEvent::TimerFired { attempt });
                    assert_eq!(effects, vec![FeedEffect::Connect]);
                    *connects += 1;
                }
                [FeedEffect::NotifyTerminal] => return,
                other => panic!("예상치 못한 효과: {other:?}"),
            }
        }
    }

    #[test]
    fn start_connects() {
        let mut sup = supervisor(10);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(sup.handle(FeedEvent::Start), vec![FeedEffect::Connect]);
        assert_eq!(sup.state(), ConnectionState::Connecting);

        assert!(sup.handle(FeedEvent::Opened).is_empty());
        assert_eq!(sup.state(), ConnectionState::Open);
    }

    #[test]
    fn always_failing_feed_stops_after_max_connects() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);
        let mut connects = 1;

        fail_until_terminal(&mut sup, &mut connects);

        assert_eq!(connects, 10);
        assert_eq!(sup.attempts(), 10);
        assert_eq!(sup.state(), ConnectionState::PermanentlyFailed);

        // 영구 실패 이후에는 어떤 이벤트도 연결을 만들지 않음
        assert!(sup.handle(FeedEvent::TimerFired { attempt: 10 }).is_empty());
        assert!(sup.handle(FeedEvent::Closed).is_empty());
        assert!(sup.handle(FeedEvent::Opened).is_empty());
        assert_eq!(sup.state(), ConnectionState::PermanentlyFailed);
    }

    #[test]
    fn success_resets_attempt_budget() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);

        // 3회 실패
        for attempt in 1..=3 {
            sup.handle(FeedEvent::Closed);
            assert_eq!(sup.attempts(), attempt);
            sup.handle(FeedEvent::TimerFired { attempt });
        }

        sup.handle(FeedEvent::Opened);
        assert_eq!(sup.attempts(), 0);

        // 성공 이후 다시 정확히 10회 실패해야 영구 실패
        let mut failures = 0;
        loop {
            let effects = sup.handle(FeedEvent::Closed);
            failures += 1;
            match effects.as_slice() {
                [FeedEffect::ScheduleRetry { attempt, .. }] => {
                    let attempt = *attempt;
                    sup.handle(FeedEvent::TimerFired { attempt });
                }
                [FeedEffect::NotifyTerminal] => break,
                other => panic!("예상치 못한 효과: {other:?}"),
            }
        }
        assert_eq!(failures, 10);
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);
        sup.handle(FeedEvent::Closed);
        sup.handle(FeedEvent::TimerFired { attempt: 1 });
        sup.handle(FeedEvent::Errored("reset".to_string()));
        assert_eq!(sup.attempts(), 2);

        // 이전 예약(attempt 1)의 타이머가 늦게 도착
        assert!(sup.handle(FeedEvent::TimerFired { attempt: 1 }).is_empty());
        assert_eq!(sup.state(), ConnectionState::ClosedRetrying);

        assert_eq!(
            sup.handle(FeedEvent::TimerFired { attempt: 2 }),
            vec![FeedEffect::Connect]
        );
    }

    #[test]
    fn duplicate_close_counts_once() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);
        sup.handle(FeedEvent::Opened);

        sup.handle(FeedEvent::Errored("broken pipe".to_string()));
        assert!(sup.handle(FeedEvent::Closed).is_empty());
        assert_eq!(sup.attempts(), 1);
    }

    #[test]
    fn teardown_cancels_pending_retry() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);
        sup.handle(FeedEvent::Closed);
        assert_eq!(sup.state(), ConnectionState::ClosedRetrying);

        assert_eq!(sup.handle(FeedEvent::Teardown), vec![FeedEffect::CancelRetry]);
        assert_eq!(sup.state(), ConnectionState::Disconnected);

        // 취소가 늦어 타이머가 도착해도 연결을 되살리지 않음
        assert!(sup.handle(FeedEvent::TimerFired { attempt: 1 }).is_empty());
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn teardown_closes_open_socket() {
        let mut sup = supervisor(10);
        sup.handle(FeedEvent::Start);
        assert_eq!(sup.handle(FeedEvent::Teardown), vec![FeedEffect::CloseSocket]);

        sup.handle(FeedEvent::Start);
        sup.handle(FeedEvent::Opened);
        assert_eq!(sup.handle(FeedEvent::Teardown), vec![FeedEffect::CloseSocket]);
        assert!(sup.handle(FeedEvent::Teardown).is_empty());
    }

    #[test]
    fn restart_after_permanent_failure_gets_fresh_budget() {
        let mut sup = supervisor(2);
        sup.handle(FeedEvent::Start);
        sup.handle(FeedEvent::Closed);
        sup.handle(FeedEvent::TimerFired { attempt: 1 });
        assert_eq!(sup.handle(FeedEvent::Closed), vec![FeedEffect::NotifyTerminal]);

        assert_eq!(sup.handle(FeedEvent::Start), vec![FeedEffect::Connect]);
        assert_eq!(sup.attempts(), 0);
    }

    #[test]
    fn zero_max_attempts_is_clamped() {
        let policy = ReconnectPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);

        let mut sup = ReconnectSupervisor::new(policy);
        sup.handle(FeedEvent::Start);
        assert_eq!(sup.handle(FeedEvent::Closed), vec![FeedEffect::NotifyTerminal]);
    }
}
