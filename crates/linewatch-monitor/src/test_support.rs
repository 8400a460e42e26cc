//! 테스트용 가짜 포트 구현.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use linewatch_core::error::CoreError;
use linewatch_core::models::feed::FeedFrame;
use linewatch_core::models::machine::MachineRecord;
use linewatch_core::models::production::{
    ProductionOrder, ScrapRequest, StartProductionRequest, StopProductionRequest,
};
use linewatch_core::ports::clock::Clock;
use linewatch_core::ports::feed::{FeedConnector, FeedSender, FeedSession};
use linewatch_core::ports::machine_api::MachineApi;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// 기준 시각 (2026-03-02 08:00:00 UTC)
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// tokio 시간(일시정지 가능)을 따라가는 시계
pub struct TokioClock {
    wall: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            wall,
            origin: tokio::time::Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        self.wall + chrono::Duration::from_std(elapsed).unwrap()
    }
}

/// 마지막 행 하나짜리 이력
pub fn history(is_running: bool, since: DateTime<Utc>) -> Vec<MachineRecord> {
    let stamp = since.to_rfc3339();
    vec![MachineRecord {
        id: 1,
        status: Some(is_running),
        machine_name: "Furadeira F400".to_string(),
        production_count: 0,
        start_production_hour: is_running.then(|| stamp.clone()),
        stop_hour: (!is_running).then_some(stamp),
        stopping_reason: (!is_running).then_some(1),
    }]
}

type Scripted = (Duration, Result<Vec<MachineRecord>, CoreError>);

/// 응답 스크립트를 순서대로 돌려주는 API
#[derive(Default)]
pub struct FakeApi {
    polls: Mutex<VecDeque<Scripted>>,
    pub fetch_calls: AtomicU32,
    pub fail_actions: Mutex<bool>,
    pub starts: Mutex<Vec<StartProductionRequest>>,
    pub stops: Mutex<Vec<StopProductionRequest>>,
    pub scraps: Mutex<Vec<ScrapRequest>>,
    pub orders: Mutex<Vec<ProductionOrder>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 다음 조회 응답 예약 (`delay` 후 반환)
    pub fn push_poll(&self, delay: Duration, response: Result<Vec<MachineRecord>, CoreError>) {
        self.polls.lock().push_back((delay, response));
    }

    pub fn set_fail_actions(&self, fail: bool) {
        *self.fail_actions.lock() = fail;
    }

    fn action_result(&self) -> Result<(), CoreError> {
        if *self.fail_actions.lock() {
            Err(CoreError::Rejected {
                status: 400,
                message: "machine busy".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MachineApi for FakeApi {
    async fn fetch_machine_data(&self) -> Result<Vec<MachineRecord>, CoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().pop_front();
        match next {
            Some((delay, response)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            }
            None => Err(CoreError::Network("no scripted response".to_string())),
        }
    }

    async fn start_production(&self, request: &StartProductionRequest) -> Result<(), CoreError> {
        self.starts.lock().push(request.clone());
        self.action_result()
    }

    async fn stop_production(&self, request: &StopProductionRequest) -> Result<(), CoreError> {
        self.stops.lock().push(request.clone());
        self.action_result()
    }

    async fn record_scrap(&self, request: &ScrapRequest) -> Result<(), CoreError> {
        self.scraps.lock().push(request.clone());
        self.action_result()
    }

    async fn search_orders(&self, query: &str) -> Result<Vec<ProductionOrder>, CoreError> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| o.name.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect())
    }
}

/// 연결 시도 결과 스크립트
pub enum Outcome {
    /// 연결 실패
    Fail,
    /// 연결 성공 후 `frames`를 차례로 수신, `hold`면 채널을 열어둔다
    Open { frames: Vec<FeedFrame>, hold: bool },
}

/// 송신 기록용 가짜 송신기
struct RecordingSender {
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicU32>,
}

#[async_trait]
impl FeedSender for RecordingSender {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 스크립트 기반 피드 커넥터: 스크립트가 끝나면 항상 실패
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<VecDeque<Outcome>>,
    held: Mutex<Vec<mpsc::Sender<FeedFrame>>>,
    pub connects: AtomicU32,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub closes: Arc<AtomicU32>,
}

impl FakeConnector {
    pub fn new(script: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedConnector for FakeConnector {
    async fn connect(&self) -> Result<FeedSession, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Outcome::Open { frames, hold }) => {
                let (tx, rx) = mpsc::channel(frames.len().max(1) + 1);
                for frame in frames {
                    let _ = tx.try_send(frame);
                }
                if hold {
                    self.held.lock().push(tx);
                }
                Ok(FeedSession {
                    sender: Box::new(RecordingSender {
                        sent: self.sent.clone(),
                        closes: self.closes.clone(),
                    }),
                    inbound: rx,
                })
            }
            Some(Outcome::Fail) | None => Err(CoreError::Feed("connection refused".to_string())),
        }
    }
}
