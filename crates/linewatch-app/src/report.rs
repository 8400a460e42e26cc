//! 콘솔 상태 보고.
//!
//! 모니터 이벤트를 로그로 옮기고 주기적으로 상태 한 줄을 남긴다.

use linewatch_core::models::machine::format_duration;
use linewatch_core::supervisor::ConnectionState;
use linewatch_monitor::{MachineMonitor, MonitorEvent, MonitorSnapshot, Notice};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::ShutdownListener;

/// 상태 한 줄
pub fn status_line(snapshot: &MonitorSnapshot) -> String {
    let status = match snapshot.latest_sample {
        None => "상태 미확인".to_string(),
        Some(sample) if sample.is_running => format!(
            "가동 중 (시작 {})",
            sample.since_time.format("%Y-%m-%d %H:%M:%S")
        ),
        Some(_) => format!("정지 {}", format_duration(snapshot.elapsed_stopped_secs)),
    };

    let feed = match snapshot.connection_state {
        ConnectionState::Open => "피드 연결".to_string(),
        ConnectionState::Disconnected => "피드 없음".to_string(),
        ConnectionState::PermanentlyFailed => "피드 중단".to_string(),
        state => format!("피드 {state} ({}회 실패)", snapshot.feed_attempts),
    };

    let mut line = format!("{status} | 생산 {} | {feed}", snapshot.production_count);
    if let (Some(order), Some(progress)) = (&snapshot.selected_order, snapshot.progress()) {
        line.push_str(&format!(
            " | {} 잔여 {}/{}",
            order.label(),
            progress.remaining,
            order.quantity
        ));
    }
    line
}

/// 이력 누계 한 줄
pub fn summary_line(snapshot: &MonitorSnapshot) -> String {
    let summary = &snapshot.summary;
    format!(
        "누적 가동 {} | 누적 정지 {} | 정지 {}회",
        format_duration(summary.total_active_secs),
        format_duration(summary.total_inactive_secs),
        summary.stops
    )
}

/// 보고 태스크 시작, 종료 사유가 정해지면 누계를 남기고 끝낸다
pub fn spawn_reporter(
    monitor: &MachineMonitor,
    interval: Duration,
    mut shutdown: ShutdownListener,
) -> JoinHandle<()> {
    let mut events = monitor.events();
    let snapshots = monitor.subscribe();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = snapshots.borrow().clone();
                    info!("{}", status_line(&snapshot));
                }
                event = events.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("이벤트 {skipped}건 건너뜀");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reason = shutdown.wait() => {
                    let snapshot = snapshots.borrow().clone();
                    info!("{} ({reason})", summary_line(&snapshot));
                    break;
                }
            }
        }
        debug!("상태 보고 종료");
    })
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::SampleUpdated(sample) => debug!(
            "상태 갱신: {}",
            if sample.is_running { "가동" } else { "정지" }
        ),
        MonitorEvent::CountUpdated(count) => debug!("생산 카운트: {count}"),
        MonitorEvent::ConnectionChanged { state, attempts } => {
            info!("피드 상태: {state} (연속 실패 {attempts})")
        }
        MonitorEvent::Notice(notice @ Notice::ActionSucceeded(_)) => info!("{notice}"),
        MonitorEvent::Notice(notice) => warn!("{notice}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use linewatch_core::models::machine::{StatusSample, StatusSummary};
    use linewatch_core::models::production::ProductionOrder;

    fn sample(is_running: bool) -> StatusSample {
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        StatusSample {
            is_running,
            sample_time: t,
            since_time: t,
        }
    }

    #[test]
    fn line_before_first_sample() {
        let line = status_line(&MonitorSnapshot::default());
        assert_eq!(line, "상태 미확인 | 생산 0 | 피드 없음");
    }

    #[test]
    fn line_when_stopped() {
        let snapshot = MonitorSnapshot {
            latest_sample: Some(sample(false)),
            elapsed_stopped_secs: 3_725,
            connection_state: ConnectionState::ClosedRetrying,
            feed_attempts: 2,
            ..Default::default()
        };
        assert_eq!(
            status_line(&snapshot),
            "정지 00:01:02:05 | 생산 0 | 피드 ClosedRetrying (2회 실패)"
        );
    }

    #[test]
    fn line_with_order_progress() {
        let snapshot = MonitorSnapshot {
            latest_sample: Some(sample(true)),
            connection_state: ConnectionState::Open,
            production_count: 120,
            selected_order: Some(ProductionOrder {
                id: 7,
                name: "Eixo".to_string(),
                quantity: 500,
                codigo_interno: "EX-7".to_string(),
            }),
            ..Default::default()
        };
        let line = status_line(&snapshot);
        assert!(line.starts_with("가동 중 (시작 2026-03-02 08:00:00)"));
        assert!(line.contains("생산 120 | 피드 연결"));
        assert!(line.ends_with("잔여 380/500"));
    }

    #[test]
    fn summary_totals() {
        let snapshot = MonitorSnapshot {
            summary: StatusSummary {
                total_active_secs: 90_061,
                total_inactive_secs: 600,
                stops: 3,
            },
            ..Default::default()
        };
        assert_eq!(
            summary_line(&snapshot),
            "누적 가동 01:01:01:01 | 누적 정지 00:00:10:00 | 정지 3회"
        );
    }
}
