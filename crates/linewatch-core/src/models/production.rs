//! 생산 오더 및 생산 액션 요청 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 생산 오더
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// 오더 ID
    pub id: i64,
    /// 오더 이름
    pub name: String,
    /// 목표 수량
    pub quantity: u64,
    /// 내부 코드
    #[serde(default)]
    pub codigo_interno: String,
}

impl ProductionOrder {
    /// 검색 결과 표시용 라벨 (`이름 - 내부코드`)
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.codigo_interno)
    }
}

/// 페이지네이션된 오더 목록 응답
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPage {
    /// 오더 목록
    #[serde(default)]
    pub results: Vec<ProductionOrder>,
    /// 전체 개수
    #[serde(default)]
    pub count: Option<u64>,
}

/// 선택된 오더의 진행 상황
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderProgress {
    /// 생산 완료 수량
    pub produced: u64,
    /// 남은 수량 (목표 초과 시 0)
    pub remaining: u64,
}

impl OrderProgress {
    /// 목표 수량과 현재 카운트로 진행 상황 계산
    pub fn new(order: &ProductionOrder, produced: u64) -> Self {
        Self {
            produced,
            remaining: order.quantity.saturating_sub(produced),
        }
    }
}

/// 생산 시작 요청 본문
#[derive(Debug, Clone, Serialize)]
pub struct StartProductionRequest {
    /// 설비 이름
    pub machine_name: String,
}

/// 생산 종료 요청 본문
#[derive(Debug, Clone, Serialize)]
pub struct StopProductionRequest {
    /// 설비 이름
    pub machine_name: String,
    /// 최종 생산 수량
    #[serde(rename = "contagem_producao")]
    pub count: u64,
    /// 불량 수량
    #[serde(rename = "refugos")]
    pub scrap: u64,
    /// 생산 종료 시각
    #[serde(rename = "hora_final_producao")]
    pub finished_at: DateTime<Utc>,
}

/// 불량 기록 요청 본문
#[derive(Debug, Clone, Serialize)]
pub struct ScrapRequest {
    /// 설비 이름
    pub machine_name: String,
    /// 불량 수량
    #[serde(rename = "refugos")]
    pub count: u64,
}

/// 단발성 생산 액션 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionAction {
    /// 생산 시작
    Start,
    /// 생산 종료
    Stop,
    /// 불량 기록
    RecordScrap,
}

impl std::fmt::Display for ProductionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductionAction::Start => write!(f, "생산 시작"),
            ProductionAction::Stop => write!(f, "생산 종료"),
            ProductionAction::RecordScrap => write!(f, "불량 기록"),
        }
    }
}
