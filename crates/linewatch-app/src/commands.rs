//! 단발 명령 실행.
//!
//! 모니터를 띄우지 않고 요청 하나만 보낸 뒤 결과를 돌려준다.

use linewatch_core::error::CoreError;
use linewatch_core::models::production::ProductionOrder;
use linewatch_monitor::MachineMonitor;
use tracing::{info, warn};

use crate::cli::Command;

/// 액션 명령 실행, 출력할 줄 목록 반환
///
/// `Command::Monitor`는 여기서 다루지 않는다 (빈 목록).
pub async fn run_action(
    monitor: &MachineMonitor,
    command: &Command,
) -> Result<Vec<String>, CoreError> {
    let machine = &monitor.options().machine_name;
    match command {
        Command::Monitor { .. } => Ok(Vec::new()),
        Command::Start => {
            monitor.start_production().await?;
            Ok(vec![format!("생산 시작: {machine}")])
        }
        Command::Stop { count, scrap } => {
            monitor.stop_production(*count, *scrap).await?;
            Ok(vec![format!("생산 종료: {machine} ({count}개, 불량 {scrap}개)")])
        }
        Command::Scrap { count } => {
            monitor.record_scrap(*count).await?;
            Ok(vec![format!("불량 기록: {machine} ({count}개)")])
        }
        Command::Orders { query } => {
            let orders = monitor.search_orders(query).await?;
            info!("생산 오더 {}건", orders.len());
            Ok(orders.iter().map(order_line).collect())
        }
    }
}

/// 검색 결과의 첫 오더를 선택
pub async fn select_first_order(
    monitor: &MachineMonitor,
    query: &str,
) -> Result<Option<ProductionOrder>, CoreError> {
    let order = monitor.search_orders(query).await?.into_iter().next();
    match &order {
        Some(order) => monitor.select_order(order.clone()),
        None => warn!("'{query}'에 맞는 생산 오더 없음"),
    }
    Ok(order)
}

fn order_line(order: &ProductionOrder) -> String {
    format!("{:>6}  {}  (목표 {})", order.id, order.label(), order.quantity)
}
