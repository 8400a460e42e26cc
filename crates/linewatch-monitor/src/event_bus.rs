//! 모니터 이벤트 버스.
//!
//! `tokio::broadcast` 기반. 구독자가 없거나 뒤처져도 발행은 막히지 않는다.

use linewatch_core::models::machine::StatusSample;
use linewatch_core::models::production::ProductionAction;
use linewatch_core::supervisor::ConnectionState;
use tokio::sync::broadcast;
use tracing::debug;

/// 호스트에 전달되는 비차단 알림
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// 상태 폴링 실패 (다음 주기에 재시도)
    PollFailed(String),
    /// 피드 재연결 포기: 세션당 한 번
    FeedGaveUp { attempts: u32 },
    /// 생산 액션 성공
    ActionSucceeded(ProductionAction),
    /// 생산 액션 실패 (낙관적 상태 롤백됨)
    ActionFailed {
        action: ProductionAction,
        message: String,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::PollFailed(reason) => write!(f, "상태 조회 실패: {reason}"),
            Notice::FeedGaveUp { attempts } => {
                write!(f, "라이브 피드 연결 포기 ({attempts}회 연속 실패)")
            }
            Notice::ActionSucceeded(action) => write!(f, "{action} 완료"),
            Notice::ActionFailed { action, message } => write!(f, "{action} 실패: {message}"),
        }
    }
}

/// 모니터 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// 새 상태 샘플 반영
    SampleUpdated(StatusSample),
    /// 피드 카운트 수신
    CountUpdated(u64),
    /// 피드 연결 상태 변경
    ConnectionChanged {
        state: ConnectionState,
        attempts: u32,
    },
    /// 알림
    Notice(Notice),
}

/// 모니터 이벤트 버스
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: MonitorEvent) {
        debug!("이벤트 발행: {:?}", std::mem::discriminant(&event));
        let _ = self.tx.send(event);
    }

    /// 알림 발행
    pub fn notify(&self, notice: Notice) {
        self.publish(MonitorEvent::Notice(notice));
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
