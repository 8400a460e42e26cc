//! # linewatch-monitor
//!
//! 설비 상태 모니터. 호스트(CLI, UI)가 `MachineMonitor` 하나를 띄우면
//! 상태 폴링, 정지 경과 티커, 라이브 카운트 피드가 함께 돌아간다.
//!
//! - [`poller`]: 고정 주기 상태 조회 (중첩 허용, 마지막 도착 우선)
//! - [`feed`]: 피드 재연결 드라이버 (`ReconnectSupervisor` 효과 실행)
//! - [`monitor`]: 상태 조립, 스냅샷 발행, 시작/종료
//! - [`actions`]: 생산 시작/종료/불량 기록, 생산 오더
//! - [`timer`]: 타이머 슬롯 (재예약 = 취소 후 시작)

pub mod actions;
pub mod event_bus;
pub mod feed;
pub mod monitor;
pub mod poller;
pub mod timer;

#[cfg(test)]
mod test_support;

pub use event_bus::{MonitorEvent, Notice};
pub use monitor::{MachineMonitor, MonitorOptions, MonitorSnapshot};
