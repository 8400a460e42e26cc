//! 설비 API 클라이언트 포트.
//!
//! 구현: `linewatch-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::machine::MachineRecord;
use crate::models::production::{
    ProductionOrder, ScrapRequest, StartProductionRequest, StopProductionRequest,
};

/// 설비 REST API 클라이언트
///
/// 모든 호출은 단발성이다. 재시도는 호출자(폴러의 다음 주기)가 결정한다.
#[async_trait]
pub trait MachineApi: Send + Sync {
    /// 설비 상태 이력 조회 (마지막 행이 최신)
    async fn fetch_machine_data(&self) -> Result<Vec<MachineRecord>, CoreError>;

    /// 생산 시작
    async fn start_production(&self, request: &StartProductionRequest) -> Result<(), CoreError>;

    /// 생산 종료
    async fn stop_production(&self, request: &StopProductionRequest) -> Result<(), CoreError>;

    /// 불량 수량 기록
    async fn record_scrap(&self, request: &ScrapRequest) -> Result<(), CoreError>;

    /// 생산 오더 검색
    async fn search_orders(&self, query: &str) -> Result<Vec<ProductionOrder>, CoreError>;
}
