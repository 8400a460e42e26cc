//! 설비 모니터.
//!
//! 폴러, 정지 티커, 피드 드라이버를 하나의 상태 뮤텍스 아래 묶는다.
//! 호스트는 `snapshot()`/`subscribe()`로 표시값을 읽고 `events()`로 알림을 받는다.

use chrono::{DateTime, Utc};
use linewatch_core::config::AppConfig;
use linewatch_core::models::feed::AuthHandshake;
use linewatch_core::models::machine::{MachineRecord, StatusSample, StatusSummary};
use linewatch_core::models::production::{OrderProgress, ProductionOrder};
use linewatch_core::ports::clock::{Clock, SystemClock};
use linewatch_core::ports::feed::FeedConnector;
use linewatch_core::ports::machine_api::MachineApi;
use linewatch_core::status::{StatusTracker, TickerEffect};
use linewatch_core::supervisor::{ConnectionState, ReconnectPolicy};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::event_bus::{EventBus, MonitorEvent, Notice};
use crate::feed::{FeedCallbacks, FeedDriver};
use crate::poller::Poller;
use crate::timer::{TimerSlot, TimerStats};

/// 모니터 실행 옵션
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// 상태 폴링 주기
    pub poll_interval: Duration,
    /// 정지 경과 티커 주기
    pub ticker_interval: Duration,
    /// 피드 재연결 정책
    pub reconnect: ReconnectPolicy,
    /// 피드 인증 핸드셰이크 (자격 증명이 설정된 경우)
    pub handshake: Option<AuthHandshake>,
    /// 액션에 실리는 설비 이름
    pub machine_name: String,
}

impl MonitorOptions {
    /// 앱 설정에서 옵션 구성
    pub fn from_config(config: &AppConfig) -> Self {
        let handshake = match (&config.feed.username, &config.feed.password) {
            (Some(user), Some(password)) => Some(AuthHandshake::new(user, password)),
            _ => None,
        };

        Self {
            poll_interval: config.poll_interval(),
            ticker_interval: config.ticker_interval(),
            reconnect: ReconnectPolicy::new(config.feed.max_attempts, config.retry_delay()),
            handshake,
            machine_name: config.production.machine_name.clone(),
        }
    }
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

/// 호스트가 읽는 표시 상태
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    /// 마지막으로 도착한 상태 샘플
    pub latest_sample: Option<StatusSample>,
    /// 피드 연결 상태
    pub connection_state: ConnectionState,
    /// 피드 연속 실패 횟수
    pub feed_attempts: u32,
    /// 정지 경과 시간 (초)
    pub elapsed_stopped_secs: u64,
    /// 정지 시작 시각
    pub stopped_since: Option<DateTime<Utc>>,
    /// 생산 시작 시각
    pub producing_since: Option<DateTime<Utc>>,
    /// 피드 생산 카운트
    pub production_count: u64,
    /// 로컬 생산 중 플래그 (낙관적)
    pub is_producing: bool,
    /// 이력 누계
    pub summary: StatusSummary,
    /// 선택된 생산 오더
    pub selected_order: Option<ProductionOrder>,
}

impl MonitorSnapshot {
    /// 가동 여부 (샘플 없으면 None)
    pub fn is_running(&self) -> Option<bool> {
        self.latest_sample.map(|s| s.is_running)
    }

    /// 선택된 오더 진행률
    pub fn progress(&self) -> Option<OrderProgress> {
        self.selected_order
            .as_ref()
            .map(|order| OrderProgress::new(order, self.production_count))
    }
}

impl Default for MonitorSnapshot {
    fn default() -> Self {
        Self {
            latest_sample: None,
            connection_state: ConnectionState::Disconnected,
            feed_attempts: 0,
            elapsed_stopped_secs: 0,
            stopped_since: None,
            producing_since: None,
            production_count: 0,
            is_producing: false,
            summary: StatusSummary::default(),
            selected_order: None,
        }
    }
}

pub(crate) struct MonitorState {
    running: bool,
    session: u64,
    tracker: StatusTracker,
    ticker: TimerSlot,
    poller: Option<Poller>,
    feed: Option<FeedDriver>,
    pub(crate) production_count: u64,
    pub(crate) is_producing: bool,
    summary: StatusSummary,
    pub(crate) selected_order: Option<ProductionOrder>,
    connection_state: ConnectionState,
    feed_attempts: u32,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            running: false,
            session: 0,
            tracker: StatusTracker::new(),
            ticker: TimerSlot::new("stopped-ticker"),
            poller: None,
            feed: None,
            production_count: 0,
            is_producing: false,
            summary: StatusSummary::default(),
            selected_order: None,
            connection_state: ConnectionState::Disconnected,
            feed_attempts: 0,
        }
    }

    fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            latest_sample: self.tracker.latest().copied(),
            connection_state: self.connection_state,
            feed_attempts: self.feed_attempts,
            elapsed_stopped_secs: self.tracker.elapsed_stopped_secs(),
            stopped_since: self.tracker.stopped_since(),
            producing_since: self.tracker.producing_since(),
            production_count: self.production_count,
            is_producing: self.is_producing,
            summary: self.summary,
            selected_order: self.selected_order.clone(),
        }
    }
}

pub(crate) struct MonitorInner {
    pub(crate) api: Arc<dyn MachineApi>,
    connector: Option<Arc<dyn FeedConnector>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) options: MonitorOptions,
    pub(crate) state: Mutex<MonitorState>,
    snapshot_tx: watch::Sender<MonitorSnapshot>,
    pub(crate) events: EventBus,
}

/// 설비 모니터 (복제 시 같은 모니터를 공유)
#[derive(Clone)]
pub struct MachineMonitor {
    pub(crate) inner: Arc<MonitorInner>,
}

impl MachineMonitor {
    /// 새 모니터 (시스템 시계)
    ///
    /// `connector`가 없으면 피드 없이 폴링만 한다.
    pub fn new(
        api: Arc<dyn MachineApi>,
        connector: Option<Arc<dyn FeedConnector>>,
        options: MonitorOptions,
    ) -> Self {
        Self::with_clock(api, connector, Arc::new(SystemClock), options)
    }

    /// 새 모니터 (시계 주입)
    pub fn with_clock(
        api: Arc<dyn MachineApi>,
        connector: Option<Arc<dyn FeedConnector>>,
        clock: Arc<dyn Clock>,
        options: MonitorOptions,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(MonitorSnapshot::default());
        Self {
            inner: Arc::new(MonitorInner {
                api,
                connector,
                clock,
                options,
                state: Mutex::new(MonitorState::new()),
                snapshot_tx,
                events: EventBus::default(),
            }),
        }
    }

    /// 시작: 즉시 첫 조회 후 주기 폴링, 피드 연결
    ///
    /// 이미 실행 중이면 아무것도 하지 않는다.
    pub fn start(&self) {
        let feed = {
            let mut state = self.inner.state.lock();
            if state.running {
                debug!("모니터가 이미 실행 중");
                return;
            }
            state.running = true;
            state.session += 1;
            let session = state.session;

            let inner = Arc::downgrade(&self.inner);
            state.poller = Some(Poller::start(self.inner.options.poll_interval, move || {
                poll_once(inner.clone(), session)
            }));

            let feed = self.inner.build_feed();
            state.feed = feed.clone();
            feed
        };

        info!(
            "설비 모니터 시작: {} (피드 {})",
            self.inner.options.machine_name,
            if feed.is_some() { "사용" } else { "미사용" }
        );
        if let Some(feed) = feed {
            feed.start();
        }
    }

    /// 종료: 폴링, 티커, 피드를 각각 한 번씩 정리
    ///
    /// 종료 후 도착한 조회 응답은 버린다. 여러 번 호출해도 안전하다.
    pub fn stop(&self) {
        let feed = {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;

            if let Some(mut poller) = state.poller.take() {
                poller.stop();
            }
            let effects = state.tracker.teardown();
            apply_ticker_effects(&self.inner, &mut state, effects);
            state.feed.take()
        };

        if let Some(feed) = feed {
            feed.stop();
        }
        self.inner.publish_snapshot();
        info!("설비 모니터 종료");
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// 현재 표시 상태
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// 표시 상태 구독
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// 이벤트/알림 구독
    pub fn events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    /// 정지 티커 누계
    pub fn ticker_stats(&self) -> TimerStats {
        self.inner.state.lock().ticker.stats()
    }

    /// 옵션
    pub fn options(&self) -> &MonitorOptions {
        &self.inner.options
    }
}

impl MonitorInner {
    /// 현재 상태를 watch 채널로 발행
    pub(crate) fn publish_snapshot(&self) {
        let snapshot = self.state.lock().snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    fn build_feed(self: &Arc<Self>) -> Option<FeedDriver> {
        let connector = self.connector.clone()?;

        let on_count = {
            let inner = Arc::downgrade(self);
            Box::new(move |count: u64| {
                if let Some(inner) = inner.upgrade() {
                    inner.state.lock().production_count = count;
                    inner.events.publish(MonitorEvent::CountUpdated(count));
                    inner.publish_snapshot();
                }
            })
        };
        let on_state = {
            let inner = Arc::downgrade(self);
            Box::new(move |state: ConnectionState, attempts: u32| {
                if let Some(inner) = inner.upgrade() {
                    {
                        let mut guard = inner.state.lock();
                        guard.connection_state = state;
                        guard.feed_attempts = attempts;
                    }
                    inner
                        .events
                        .publish(MonitorEvent::ConnectionChanged { state, attempts });
                    inner.publish_snapshot();
                }
            })
        };
        let on_terminal = {
            let inner = Arc::downgrade(self);
            Box::new(move |attempts: u32| {
                if let Some(inner) = inner.upgrade() {
                    warn!("라이브 피드 재연결 포기 ({attempts}회 연속 실패)");
                    inner.events.notify(Notice::FeedGaveUp { attempts });
                }
            })
        };

        Some(FeedDriver::new(
            connector,
            self.options.reconnect,
            self.options.handshake.clone(),
            FeedCallbacks {
                on_count,
                on_terminal,
                on_state,
            },
        ))
    }

    /// 조회 결과 반영 (마지막 도착 우선)
    fn apply_records(self: &Arc<Self>, session: u64, records: &[MachineRecord]) {
        let now = self.clock.now();
        let sample = match StatusSample::from_records(records, now) {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                debug!("상태 없는 응답: 표시 유지");
                return;
            }
            Err(e) => {
                self.report_poll_failure(session, e.to_string());
                return;
            }
        };

        {
            let mut state = self.state.lock();
            if !state.running || state.session != session {
                debug!("종료 후 도착한 조회 응답 무시");
                return;
            }
            state.summary = StatusSummary::from_records(records);
            let effects = state.tracker.apply(sample, now);
            apply_ticker_effects(self, &mut state, effects);
        }

        debug!(
            "상태 반영: {} (기준 {})",
            if sample.is_running { "가동" } else { "정지" },
            sample.since_time
        );
        self.events.publish(MonitorEvent::SampleUpdated(sample));
        self.publish_snapshot();
    }

    fn report_poll_failure(&self, session: u64, reason: String) {
        warn!("상태 조회 실패: {reason}");
        let current = {
            let state = self.state.lock();
            state.running && state.session == session
        };
        if current {
            self.events.notify(Notice::PollFailed(reason));
        }
    }

    /// 티커 한 번: 정지 경과 시간 갱신
    fn tick(&self) {
        {
            let mut state = self.state.lock();
            let now = self.clock.now();
            state.tracker.tick(now);
        }
        self.publish_snapshot();
    }
}

/// 폴링 한 번
async fn poll_once(inner: Weak<MonitorInner>, session: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    match inner.api.fetch_machine_data().await {
        Ok(records) => inner.apply_records(session, &records),
        Err(e) => inner.report_poll_failure(session, e.to_string()),
    }
}

/// 티커 효과 실행: 상태 잠금 안에서 호출
fn apply_ticker_effects(inner: &Arc<MonitorInner>, state: &mut MonitorState, effects: Vec<TickerEffect>) {
    for effect in effects {
        match effect {
            TickerEffect::Cancel => {
                state.ticker.cancel();
            }
            TickerEffect::Start => {
                let period = inner.options.ticker_interval.max(Duration::from_millis(1));
                let weak = Arc::downgrade(inner);
                state.ticker.arm(async move {
                    let start = tokio::time::Instant::now() + period;
                    let mut ticker = tokio::time::interval_at(start, period);
                    loop {
                        ticker.tick().await;
                        match weak.upgrade() {
                            Some(inner) => inner.tick(),
                            None => break,
                        }
                    }
                });
            }
        }
    }
}
