//! 종료 흐름.
//!
//! OS 시그널이나 내부 요청 중 먼저 온 쪽이 종료 사유가 된다.
//! 정리 작업은 유예 시간 안에서만 기다린다.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// 프로그램 내부 요청
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "인터럽트"),
            Self::Terminate => write!(f, "종료 시그널"),
            Self::Requested => write!(f, "내부 요청"),
        }
    }
}

/// 종료 대기 핸들
///
/// 구독 전에 이미 종료가 요청됐어도 바로 반환한다.
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownListener {
    /// 종료 사유가 정해질 때까지 대기
    pub async fn wait(&mut self) -> ShutdownReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Requested),
            // 관리자가 사라지면 종료로 본다
            Err(_) => ShutdownReason::Requested,
        }
    }
}

/// 라이프사이클 관리자
pub struct LifecycleManager {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// 종료 대기 핸들 발급
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// 종료 요청, 이미 사유가 있으면 무시하고 `false`
    pub fn request(&self, reason: ShutdownReason) -> bool {
        let accepted = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if accepted {
            info!("종료 요청: {reason}");
        }
        accepted
    }

    /// 확정된 종료 사유
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// OS 시그널 또는 내부 요청 대기
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let mut listener = self.listener();
        tokio::select! {
            reason = os_signal() => {
                self.request(reason);
            }
            _ = listener.wait() => {}
        }
        self.reason().unwrap_or(ShutdownReason::Requested)
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 유예 시간 안에 정리 작업 실행, 시간 초과 시 `false`
pub async fn run_cleanup<F>(grace: Duration, cleanup: F) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(grace, cleanup).await {
        Ok(()) => true,
        Err(_) => {
            warn!("정리 작업이 {}ms 안에 끝나지 않음", grace.as_millis());
            false
        }
    }
}

#[cfg(unix)]
async fn os_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(mut sigint), Ok(mut sigterm)) => tokio::select! {
            _ = sigint.recv() => ShutdownReason::Interrupt,
            _ = sigterm.recv() => ShutdownReason::Terminate,
        },
        (Err(e), _) | (_, Err(e)) => {
            warn!("시그널 핸들러 등록 실패, Ctrl+C만 대기: {e}");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() -> ShutdownReason {
    ctrl_c().await
}

async fn ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C 핸들러 등록 실패: {e}");
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}
