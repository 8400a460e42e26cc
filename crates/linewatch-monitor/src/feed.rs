//! 라이브 카운트 피드 드라이버.
//!
//! `ReconnectSupervisor`가 돌려준 효과를 tokio 위에서 실행한다.
//! 연결 태스크와 재연결 타이머가 보내는 이벤트에는 세대 번호(epoch)가 붙고,
//! 현재 세대가 아닌 이벤트는 버린다. 종료 후 늦게 도착한 타이머나
//! 소켓 콜백이 피드를 되살리지 못한다.
//!
//! 콜백은 피드 잠금 밖에서 호출되지만 전달 잠금으로 직렬화되어,
//! 상태가 바뀐 순서 그대로 도착한다.

use linewatch_core::error::CoreError;
use linewatch_core::models::feed::{AuthHandshake, FeedFrame, FeedPayload};
use linewatch_core::ports::feed::{FeedConnector, FeedSession};
use linewatch_core::supervisor::{
    ConnectionState, FeedEffect, FeedEvent, ReconnectPolicy, ReconnectSupervisor,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::timer::{TimerSlot, TimerStats};

/// 카운트 콜백
pub type CountCallback = Box<dyn Fn(u64) + Send + Sync>;
/// 영구 실패 콜백 (연속 실패 횟수)
pub type TerminalCallback = Box<dyn Fn(u32) + Send + Sync>;
/// 상태 변경 콜백
pub type StateCallback = Box<dyn Fn(ConnectionState, u32) + Send + Sync>;

/// 피드 콜백 묶음
pub struct FeedCallbacks {
    /// `count` 메시지 수신
    pub on_count: CountCallback,
    /// 재연결 포기 (세션당 한 번)
    pub on_terminal: TerminalCallback,
    /// 연결 상태 또는 실패 횟수 변경
    pub on_state: StateCallback,
}

impl Default for FeedCallbacks {
    fn default() -> Self {
        Self {
            on_count: Box::new(|_| {}),
            on_terminal: Box::new(|_| {}),
            on_state: Box::new(|_, _| {}),
        }
    }
}

/// 현재 연결 태스크
struct ConnectionHandle {
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct FeedCore {
    supervisor: ReconnectSupervisor,
    epoch: u64,
    retry: TimerSlot,
    connection: Option<ConnectionHandle>,
    connects: u64,
}

struct FeedShared {
    connector: Arc<dyn FeedConnector>,
    handshake: Option<AuthHandshake>,
    callbacks: FeedCallbacks,
    core: Mutex<FeedCore>,
    /// 콜백 전달 순서 (항상 `core` 다음에 잡는다)
    delivery: Mutex<()>,
}

/// 피드 드라이버 (복제 시 같은 피드를 공유)
#[derive(Clone)]
pub struct FeedDriver {
    shared: Arc<FeedShared>,
}

impl FeedDriver {
    /// 새 드라이버 (Disconnected)
    pub fn new(
        connector: Arc<dyn FeedConnector>,
        policy: ReconnectPolicy,
        handshake: Option<AuthHandshake>,
        callbacks: FeedCallbacks,
    ) -> Self {
        Self {
            shared: Arc::new(FeedShared {
                connector,
                handshake,
                callbacks,
                core: Mutex::new(FeedCore {
                    supervisor: ReconnectSupervisor::new(policy),
                    epoch: 0,
                    retry: TimerSlot::new("feed-retry"),
                    connection: None,
                    connects: 0,
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    /// 연결 시작 (Disconnected 또는 PermanentlyFailed에서만 유효)
    pub fn start(&self) {
        self.shared.dispatch(None, FeedEvent::Start);
    }

    /// 종료: 소켓을 닫고 대기 중인 재연결을 취소한다
    pub fn stop(&self) {
        self.shared.dispatch(None, FeedEvent::Teardown);
    }

    /// 현재 연결 상태
    pub fn state(&self) -> ConnectionState {
        self.shared.core.lock().supervisor.state()
    }

    /// 연속 실패 횟수
    pub fn attempts(&self) -> u32 {
        self.shared.core.lock().supervisor.attempts()
    }

    /// 지금까지의 연결 시도 횟수
    pub fn connect_count(&self) -> u64 {
        self.shared.core.lock().connects
    }

    /// 재연결 타이머 누계
    pub fn retry_stats(&self) -> TimerStats {
        self.shared.core.lock().retry.stats()
    }
}

impl FeedShared {
    /// 이벤트 처리 + 효과 실행
    ///
    /// `origin`이 있으면 현재 세대와 같을 때만 처리한다.
    /// 콜백은 피드 잠금을 푼 뒤 전달 잠금 안에서 호출한다.
    fn dispatch(self: &Arc<Self>, origin: Option<u64>, event: FeedEvent) {
        let is_teardown = event == FeedEvent::Teardown;

        let (changed, terminal, _delivery) = {
            let mut core = self.core.lock();
            if origin.is_some_and(|epoch| epoch != core.epoch) {
                debug!("이전 세대 피드 이벤트 무시: {event:?}");
                return;
            }

            let before = (core.supervisor.state(), core.supervisor.attempts());
            let effects = core.supervisor.handle(event);

            let mut terminal = None;
            for effect in effects {
                match effect {
                    FeedEffect::Connect => self.spawn_connection(&mut core),
                    FeedEffect::ScheduleRetry { attempt, delay } => {
                        let shared = Arc::clone(self);
                        let epoch = core.epoch;
                        core.retry.arm(async move {
                            tokio::time::sleep(delay).await;
                            shared.dispatch(Some(epoch), FeedEvent::TimerFired { attempt });
                        });
                    }
                    FeedEffect::CancelRetry => {
                        core.retry.cancel();
                    }
                    FeedEffect::CloseSocket => {
                        if let Some(conn) = core.connection.take() {
                            let _ = conn.close_tx.send(());
                        }
                    }
                    FeedEffect::NotifyTerminal => terminal = Some(core.supervisor.attempts()),
                }
            }

            if is_teardown {
                core.epoch += 1;
                core.connection = None;
            }

            let after = (core.supervisor.state(), core.supervisor.attempts());
            let changed = (before != after).then_some(after);
            (changed, terminal, self.hand_over(core))
        };

        if let Some((state, attempts)) = changed {
            (self.callbacks.on_state)(state, attempts);
        }
        if let Some(attempts) = terminal {
            (self.callbacks.on_terminal)(attempts);
        }
    }

    /// 새 연결 태스크 시작 (세대 증가)
    fn spawn_connection(self: &Arc<Self>, core: &mut FeedCore) {
        core.epoch += 1;
        core.connects += 1;

        if let Some(old) = core.connection.take() {
            if !old.task.is_finished() {
                debug!("이전 연결 태스크 정리");
            }
            let _ = old.close_tx.send(());
        }

        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(Arc::clone(self).run_connection(core.epoch, close_rx));
        core.connection = Some(ConnectionHandle { close_tx, task });
    }

    /// 피드 잠금을 전달 잠금으로 교대
    ///
    /// 전달 잠금을 먼저 잡고 피드 잠금을 풀어서, 뒤에 처리된 이벤트의
    /// 콜백이 앞선 콜백을 추월하지 못한다.
    fn hand_over<'a>(&'a self, core: MutexGuard<'a, FeedCore>) -> MutexGuard<'a, ()> {
        let delivery = self.delivery.lock();
        drop(core);
        delivery
    }

    /// 연결 한 번의 수명
    async fn run_connection(self: Arc<Self>, epoch: u64, mut close_rx: oneshot::Receiver<()>) {
        let connector = Arc::clone(&self.connector);
        let opened = tokio::select! {
            _ = &mut close_rx => return,
            result = self.open_session(connector) => result,
        };

        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                self.dispatch(Some(epoch), FeedEvent::Errored(e.to_string()));
                return;
            }
        };

        info!("라이브 피드 연결됨");
        self.dispatch(Some(epoch), FeedEvent::Opened);

        loop {
            tokio::select! {
                _ = &mut close_rx => {
                    if let Err(e) = session.sender.close().await {
                        debug!("피드 종료 프레임 전송 실패: {e}");
                    }
                    debug!("피드 연결 종료 (요청)");
                    return;
                }
                frame = session.inbound.recv() => match frame {
                    Some(FeedFrame::Text(text)) => self.handle_text(epoch, &text),
                    Some(FeedFrame::Binary(data)) => {
                        debug!("바이너리 피드 메시지 무시 ({} bytes)", data.len());
                    }
                    Some(FeedFrame::Close) | None => {
                        info!("라이브 피드 연결 끊김");
                        self.dispatch(Some(epoch), FeedEvent::Closed);
                        return;
                    }
                    Some(FeedFrame::Error(reason)) => {
                        self.dispatch(Some(epoch), FeedEvent::Errored(reason));
                        return;
                    }
                },
            }
        }
    }

    /// 연결 + 인증 핸드셰이크
    async fn open_session(
        &self,
        connector: Arc<dyn FeedConnector>,
    ) -> Result<FeedSession, CoreError> {
        let session = connector.connect().await?;
        if let Some(handshake) = &self.handshake {
            let text = serde_json::to_string(handshake)?;
            session.sender.send_text(&text).await?;
            debug!("피드 인증 핸드셰이크 전송");
        }
        Ok(session)
    }

    /// 텍스트 메시지 처리: 잘못된 메시지는 기록만 한다
    fn handle_text(&self, epoch: u64, text: &str) {
        match FeedPayload::parse(text) {
            FeedPayload::Count(count) => {
                let core = self.core.lock();
                if core.epoch != epoch {
                    debug!("이전 세대 카운트 무시: {count}");
                    return;
                }
                let _delivery = self.hand_over(core);
                (self.callbacks.on_count)(count);
            }
            FeedPayload::Unrecognized(value) => {
                debug!("count 없는 피드 메시지 무시: {value}");
            }
            FeedPayload::Malformed(reason) => {
                warn!("피드 메시지 파싱 실패: {reason}");
            }
        }
    }
}
