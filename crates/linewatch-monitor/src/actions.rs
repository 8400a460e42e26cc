//! 단발성 생산 액션과 생산 오더 선택.
//!
//! 요청 한 번, 재시도 없음. `is_producing`은 요청 전에 낙관적으로 바꾸고
//! 실패하면 되돌린 뒤 `Notice::ActionFailed`를 발행한다.

use linewatch_core::error::CoreError;
use linewatch_core::models::production::{
    OrderProgress, ProductionAction, ProductionOrder, ScrapRequest, StartProductionRequest,
    StopProductionRequest,
};
use tracing::{info, warn};

use crate::event_bus::Notice;
use crate::monitor::MachineMonitor;

impl MachineMonitor {
    /// 생산 시작
    pub async fn start_production(&self) -> Result<(), CoreError> {
        let previous = self.set_producing(true);
        let request = StartProductionRequest {
            machine_name: self.inner.options.machine_name.clone(),
        };

        let result = self.inner.api.start_production(&request).await;
        self.settle(ProductionAction::Start, previous, result)
    }

    /// 생산 종료: 성공하면 로컬 생산 카운트를 0으로 되돌린다
    pub async fn stop_production(&self, count: u64, scrap: u64) -> Result<(), CoreError> {
        let previous = self.set_producing(false);
        let request = StopProductionRequest {
            machine_name: self.inner.options.machine_name.clone(),
            count,
            scrap,
            finished_at: self.inner.clock.now(),
        };

        let result = self.inner.api.stop_production(&request).await;
        if result.is_ok() {
            self.inner.state.lock().production_count = 0;
        }
        self.settle(ProductionAction::Stop, previous, result)
    }

    /// 불량 수량 기록
    pub async fn record_scrap(&self, count: u64) -> Result<(), CoreError> {
        let request = ScrapRequest {
            machine_name: self.inner.options.machine_name.clone(),
            count,
        };

        let result = self.inner.api.record_scrap(&request).await;
        let current = self.inner.state.lock().is_producing;
        self.settle(ProductionAction::RecordScrap, current, result)
    }

    /// 생산 오더 검색
    pub async fn search_orders(&self, query: &str) -> Result<Vec<ProductionOrder>, CoreError> {
        self.inner.api.search_orders(query).await.inspect_err(|e| {
            warn!("생산 오더 검색 실패: {e}");
        })
    }

    /// 생산 오더 선택: 생산 카운트를 0으로 되돌린다
    pub fn select_order(&self, order: ProductionOrder) {
        info!("생산 오더 선택: {}", order.label());
        {
            let mut state = self.inner.state.lock();
            state.selected_order = Some(order);
            state.production_count = 0;
        }
        self.inner.publish_snapshot();
    }

    /// 생산 오더 선택 해제
    pub fn clear_order(&self) {
        self.inner.state.lock().selected_order = None;
        self.inner.publish_snapshot();
    }

    /// 선택된 오더 진행률
    pub fn progress(&self) -> Option<OrderProgress> {
        let state = self.inner.state.lock();
        state
            .selected_order
            .as_ref()
            .map(|order| OrderProgress::new(order, state.production_count))
    }

    /// 낙관적 플래그 설정 → 이전 값
    fn set_producing(&self, producing: bool) -> bool {
        let previous = std::mem::replace(&mut self.inner.state.lock().is_producing, producing);
        self.inner.publish_snapshot();
        previous
    }

    /// 결과 정리: 실패 시 `previous`로 롤백하고 알림
    fn settle(
        &self,
        action: ProductionAction,
        previous: bool,
        result: Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        match result {
            Ok(()) => {
                info!("{action} 완료: {}", self.inner.options.machine_name);
                self.inner.publish_snapshot();
                self.inner.events.notify(Notice::ActionSucceeded(action));
                Ok(())
            }
            Err(e) => {
                warn!("{action} 실패: {e}");
                self.inner.state.lock().is_producing = previous;
                self.inner.publish_snapshot();
                self.inner.events.notify(Notice::ActionFailed {
                    action,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
